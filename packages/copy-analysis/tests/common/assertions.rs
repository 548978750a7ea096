//! Custom assertions for copy sets

use copy_analysis::features::copy_analysis::{CopyAbstractValueKind, CopyBlockAnalysisResult};
use copy_analysis::shared::models::AnalysisEntity;

/// Members of `entity`'s copy set (the entity alone when it has no entry)
pub fn copy_set(block: &CopyBlockAnalysisResult, entity: &AnalysisEntity) -> Vec<AnalysisEntity> {
    match block.get(entity) {
        Some(value) if value.is_known() => value.entities().iter().cloned().collect(),
        Some(_) => Vec::new(),
        None => vec![entity.clone()],
    }
}

/// Assert that `a` and `b` are known copies of each other
pub fn assert_copies(block: &CopyBlockAnalysisResult, a: &AnalysisEntity, b: &AnalysisEntity) {
    let set = copy_set(block, a);
    assert!(
        set.contains(b),
        "Expected {a:?} and {b:?} to be copies, copy set of {a:?} is {set:?}"
    );
    assert!(
        copy_set(block, b).contains(a),
        "Copy sets of {a:?} and {b:?} are not symmetric"
    );
}

/// Assert that `a` and `b` are not known to be copies
pub fn assert_not_copies(block: &CopyBlockAnalysisResult, a: &AnalysisEntity, b: &AnalysisEntity) {
    let set = copy_set(block, a);
    assert!(
        !set.contains(b),
        "Expected {a:?} and {b:?} not to be copies, copy set of {a:?} is {set:?}"
    );
}

pub fn assert_kind(block: &CopyBlockAnalysisResult, entity: &AnalysisEntity, expected: CopyAbstractValueKind) {
    let actual = block.get(entity).map(|v| v.kind());
    assert_eq!(actual, Some(expected), "Unexpected kind for {entity:?}");
}
