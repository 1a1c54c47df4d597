use coordinator_adapters::TabularStoreAdapter;
use coordinator_db::TeamRepo;
use tracing::instrument;

use crate::types::{AssigneeResolution, AssigneeTier, StaticAssigneeDirectory};

/// 3-tier assignee lookup: relational store, then tabular store, then
/// static config, first hit wins.
pub struct AssigneeResolver<'a> {
    pub team_repo: &'a TeamRepo,
    pub tabular_store: Option<&'a TabularStoreAdapter>,
    pub static_directory: &'a StaticAssigneeDirectory,
}

impl<'a> AssigneeResolver<'a> {
    #[instrument(skip(self))]
    pub async fn resolve(&self, candidate_name: &str) -> Option<AssigneeResolution> {
        if let Ok(Some(member)) = self.team_repo.get_by_name(candidate_name) {
            if member.active {
                return Some(AssigneeResolution {
                    name: member.name,
                    transport_id: member.transport_id,
                    tier: AssigneeTier::RelationalStore,
                });
            }
        }

        if let Some(tabular) = self.tabular_store {
            if let Ok(Some(transport_id)) = tabular.lookup_assignee(candidate_name).await {
                return Some(AssigneeResolution {
                    name: candidate_name.to_string(),
                    transport_id: Some(transport_id),
                    tier: AssigneeTier::TabularStore,
                });
            }
        }

        self.static_directory
            .get(candidate_name)
            .map(|transport_id| AssigneeResolution {
                name: candidate_name.to_string(),
                transport_id: Some(transport_id.clone()),
                tier: AssigneeTier::StaticConfig,
            })
    }
}
