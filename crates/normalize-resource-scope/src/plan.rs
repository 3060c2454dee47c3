//! Acquisition and release ordering.
//!
//! Items are acquired left to right and released in exactly the reverse
//! order, whatever the item count.

use crate::error::LowerError;
use crate::ir::ResourceItem;

/// Acquisition order and the matching release order, as item indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionPlan {
    acquire: Vec<usize>,
    release: Vec<usize>,
}

impl AcquisitionPlan {
    /// Plan for `len` items. `len` may be zero; [`plan`] rejects that case.
    pub fn for_len(len: usize) -> Self {
        let acquire: Vec<usize> = (0..len).collect();
        let release = acquire.iter().rev().copied().collect();
        Self { acquire, release }
    }

    pub fn acquire_order(&self) -> &[usize] {
        &self.acquire
    }

    pub fn release_order(&self) -> &[usize] {
        &self.release
    }

    pub fn len(&self) -> usize {
        self.acquire.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acquire.is_empty()
    }

    /// Items released when acquiring `failed` raises: everything acquired
    /// before it, newest first.
    pub fn releases_after_failure(&self, failed: usize) -> impl Iterator<Item = usize> + '_ {
        self.release.iter().copied().filter(move |&i| i < failed)
    }
}

/// Plan the item sequence of a scoped statement.
pub fn plan(items: &[ResourceItem]) -> Result<AcquisitionPlan, LowerError> {
    if items.is_empty() {
        return Err(LowerError::EmptyStatement);
    }
    Ok(AcquisitionPlan::for_len(items.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Expr;

    #[test]
    fn test_release_is_reverse_of_acquire() {
        for n in 1..=12 {
            let plan = AcquisitionPlan::for_len(n);
            let mut reversed = plan.acquire_order().to_vec();
            reversed.reverse();
            assert_eq!(plan.release_order(), reversed.as_slice(), "n = {}", n);
            assert_eq!(plan.len(), n);
        }
    }

    #[test]
    fn test_single_item() {
        let plan = AcquisitionPlan::for_len(1);
        assert_eq!(plan.acquire_order(), &[0]);
        assert_eq!(plan.release_order(), &[0]);
    }

    #[test]
    fn test_releases_after_failure() {
        let plan = AcquisitionPlan::for_len(4);
        assert_eq!(plan.releases_after_failure(2).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(plan.releases_after_failure(0).count(), 0);
    }

    #[test]
    fn test_empty_items_rejected() {
        assert_eq!(plan(&[]), Err(LowerError::EmptyStatement));

        let items = vec![ResourceItem::new(Expr::ident("a")); 3];
        assert_eq!(plan(&items).unwrap().acquire_order(), &[0, 1, 2]);
    }
}
