use std::cmp::Ordering;

use crate::api::ModelInfo;

/// Newest first when the provider reports dates, then by id.
pub fn sort_models(models: &mut [ModelInfo]) {
    models.sort_by(|a, b| {
        let by_date = match (a.created, b.created) {
            (Some(a_created), Some(b_created)) => b_created.cmp(&a_created),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            // RFC 3339 timestamps order correctly as strings.
            (None, None) => match (&a.created_at, &b.created_at) {
                (Some(a_at), Some(b_at)) => b_at.cmp(a_at),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        by_date.then_with(|| a.id.cmp(&b.id))
    });
}
