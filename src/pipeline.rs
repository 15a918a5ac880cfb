// 🧭 Pipeline Board - kanban columns and stage moves

use crate::coordinator::{MutationFailure, NoticeText, OptimisticCoordinator};
use crate::entities::{Deal, DealPatch, DealStage, EntityId};
use crate::query::group_by_stage;
use serde::Serialize;

/// One kanban column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageColumn {
    pub stage: DealStage,
    pub title: &'static str,
    pub total_value: f64,
    pub deals: Vec<Deal>,
}

/// Every stage in board order, empty columns included
pub fn board(deals: &[Deal]) -> Vec<StageColumn> {
    group_by_stage(deals)
        .into_iter()
        .map(|(stage, deals)| StageColumn {
            stage,
            title: stage.title(),
            total_value: deals.iter().map(|d| d.value).sum(),
            deals,
        })
        .collect()
}

/// Patch for dropping `deal` onto the `target` column; `None` when it
/// already sits there
pub fn stage_move(deal: &Deal, target: DealStage) -> Option<DealPatch> {
    (deal.stage != target).then(|| DealPatch::stage(target))
}

pub fn stage_move_text(target: DealStage) -> NoticeText {
    NoticeText::new(
        format!("Deal moved to {}!", target.title()),
        "Failed to update deal",
    )
}

impl OptimisticCoordinator<Deal> {
    /// Kanban drop. `Ok(None)` means nothing changed and the store was not
    /// called.
    pub async fn move_to_stage(
        &self,
        id: EntityId,
        target: DealStage,
    ) -> Result<Option<Deal>, MutationFailure> {
        let patch = match self.get(id) {
            Some(deal) => match stage_move(&deal, target) {
                Some(patch) => patch,
                None => return Ok(None),
            },
            None => DealPatch::stage(target),
        };

        self.apply(id, patch, &stage_move_text(target)).await.map(Some)
    }
}
