use std::fmt::Write as _;

/// Row-major iterator over the index tuples of the leading dimensions of a
/// shape, i.e. over the 2-D slabs of a ≥ 3-D variable.
///
/// The ordering is part of the orchestrator's contract: report lines and
/// per-slab statistics follow it.
#[derive(Clone, Debug)]
pub struct SlabIter {
    leading: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl SlabIter {
    /// Creates an iterator over the slabs of `shape`, which must have rank
    /// ≥ 3. The trailing two dimensions span each slab.
    ///
    /// An empty leading extent yields no slabs.
    #[must_use]
    pub fn new(shape: &[usize]) -> Self {
        debug_assert!(shape.len() >= 3);
        let leading = shape[..shape.len() - 2].to_vec();
        let next = if leading.iter().any(|&extent| extent == 0) {
            None
        } else {
            Some(vec![0; leading.len()])
        };
        Self { leading, next }
    }

    /// Total number of slabs.
    #[must_use]
    pub fn count_slabs(&self) -> usize {
        self.leading.iter().product()
    }
}

impl Iterator for SlabIter {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.clone()?;

        // odometer increment with carry from the innermost leading axis
        let mut index = current.clone();
        let mut carry = true;
        for axis in (0..index.len()).rev() {
            if !carry {
                break;
            }
            index[axis] += 1;
            if index[axis] < self.leading[axis] {
                carry = false;
            } else {
                index[axis] = 0;
            }
        }
        self.next = if carry { None } else { Some(index) };

        Some(current)
    }
}

/// Formats the report label of one slab, `[i₁,…,i_{r−2},:,:]`.
#[must_use]
pub fn slab_label(index: &[usize]) -> String {
    let mut label = String::from("[");
    for &i in index {
        let _ = write!(label, "{i},");
    }
    label.push_str(":,:]");
    label
}
