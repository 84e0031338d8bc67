//! Field-by-field comparison against the target and submission of updates

use super::report::{FailedUpdate, FieldUpdate, ResourceReport, UpdateReason};
use crate::adapter::TargetGateway;
use crate::graph::{FieldMap, RecordId, ResourceId};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Computes the minimal update set for a resource and submits it.
///
/// Missing fields are always written. The keywords field only needs an update
/// when the target lacks one of the fetched keywords; extra keywords already
/// on the target are left alone. Every other field is compared exactly.
#[derive(Debug, Clone)]
pub struct FieldReconciler {
    keywords_field: String,
    timeout: Duration,
}

impl FieldReconciler {
    pub fn new(keywords_field: impl Into<String>) -> Self {
        Self {
            keywords_field: keywords_field.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Bound on each gateway call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Decide whether one field needs writing
    pub fn needs_update(&self, field: &str, new_value: &str, current: Option<&str>) -> Option<UpdateReason> {
        let Some(current) = current else {
            return Some(UpdateReason::Missing);
        };
        let satisfied = if field == self.keywords_field {
            keywords_satisfied(new_value, current)
        } else {
            new_value == current
        };
        if satisfied {
            None
        } else {
            Some(UpdateReason::Mismatch {
                current: current.to_string(),
            })
        }
    }

    /// Fields of `new` that the target must receive
    pub fn diff(&self, new: &FieldMap, old: &FieldMap) -> Vec<FieldUpdate> {
        new.iter()
            .filter_map(|(field, value)| {
                let reason = self.needs_update(field, value, old.get(field).map(String::as_str))?;
                match &reason {
                    UpdateReason::Missing => debug!(field = %field, should_be = %value, "field missing on target"),
                    UpdateReason::Mismatch { current } => {
                        debug!(field = %field, should_be = %value, is = %current, "field mismatch")
                    }
                }
                Some(FieldUpdate {
                    field: field.clone(),
                    value: value.clone(),
                    reason,
                })
            })
            .collect()
    }

    /// Submit planned updates one field at a time.
    ///
    /// A rejected field is recorded and the remaining fields still go out.
    pub async fn apply(
        &self,
        resource: &ResourceId,
        record: &RecordId,
        planned: Vec<FieldUpdate>,
        gateway: &dyn TargetGateway,
    ) -> ResourceReport {
        let mut report = ResourceReport::new(resource.clone(), record.clone(), planned);

        for update in &report.planned {
            let call = gateway.update_field(resource, &update.field, &update.value);
            let outcome = match tokio::time::timeout(self.timeout, call).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!("timed out after {:?}", self.timeout)),
            };
            match outcome {
                Ok(()) => report.updated.push(update.field.clone()),
                Err(message) => {
                    warn!(%resource, field = %update.field, %message, "error updating field");
                    report.failed.push(FailedUpdate {
                        field: update.field.clone(),
                        message,
                    });
                }
            }
        }

        if report.applied_count() > 0 {
            debug!(%resource, updated = report.applied_count(), "updated fields");
        }
        report
    }

    /// Diff and apply in one step
    pub async fn reconcile(
        &self,
        resource: &ResourceId,
        record: &RecordId,
        new: &FieldMap,
        old: &FieldMap,
        gateway: &dyn TargetGateway,
    ) -> ResourceReport {
        let planned = self.diff(new, old);
        self.apply(resource, record, planned, gateway).await
    }
}

/// True if every keyword in `new` is already present in `current`.
///
/// Both sides are comma-separated; tokens are trimmed and blanks ignored.
pub fn keywords_satisfied(new: &str, current: &str) -> bool {
    let have = keyword_tokens(current);
    keyword_tokens(new).is_subset(&have)
}

fn keyword_tokens(value: &str) -> BTreeSet<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::GatewayError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Gateway that records calls and rejects a configured field
    struct RecordingGateway {
        reject: Option<&'static str>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl RecordingGateway {
        fn new(reject: Option<&'static str>) -> Self {
            Self {
                reject,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TargetGateway for RecordingGateway {
        async fn update_field(&self, _resource: &ResourceId, field: &str, value: &str) -> Result<(), GatewayError> {
            self.calls.lock().unwrap().push((field.to_string(), value.to_string()));
            if self.reject == Some(field) {
                return Err(GatewayError::Rejected("field is locked".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn keyword_subset_needs_no_update() {
        assert!(keywords_satisfied("a, b", "a, b, c"));
        assert!(!keywords_satisfied("a, d", "a, b, c"));
        assert!(keywords_satisfied("", "a"));
        assert!(keywords_satisfied("b,a", "a, b"));
    }

    #[test]
    fn diff_applies_field_rules() {
        let reconciler = FieldReconciler::new("keywords");
        let new = fields(&[
            ("keywords", "a, b"),
            ("title", "Altarpiece"),
            ("creator", "Van Eyck"),
            ("medium", "oil"),
        ]);
        let old = fields(&[
            ("keywords", "a, b, c"),
            ("title", "Altar piece"),
            ("medium", "oil"),
        ]);

        let updates = reconciler.diff(&new, &old);
        let flagged: Vec<_> = updates.iter().map(|u| u.field.as_str()).collect();
        assert_eq!(flagged, vec!["creator", "title"]);
        assert_eq!(updates[0].reason, UpdateReason::Missing);
        assert_eq!(
            updates[1].reason,
            UpdateReason::Mismatch {
                current: "Altar piece".into()
            }
        );
    }

    #[test]
    fn missing_keywords_trigger_update() {
        let reconciler = FieldReconciler::new("keywords");
        let updates = reconciler.diff(&fields(&[("keywords", "a, d")]), &fields(&[("keywords", "a, b, c")]));
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].value, "a, d");
    }

    #[test]
    fn exact_comparison_outside_keywords() {
        let reconciler = FieldReconciler::new("keywords");
        assert!(reconciler.needs_update("title", "a, b", Some("a, b, c")).is_some());
        assert!(reconciler.needs_update("title", "same", Some("same")).is_none());
        assert_eq!(reconciler.needs_update("title", "", None), Some(UpdateReason::Missing));
    }

    #[tokio::test]
    async fn rejected_field_does_not_block_others() {
        let reconciler = FieldReconciler::new("keywords");
        let gateway = RecordingGateway::new(Some("creator"));
        let new = fields(&[("creator", "X"), ("title", "Y"), ("medium", "Z")]);

        let report = reconciler
            .reconcile(
                &ResourceId::from("7"),
                &RecordId::from("R7"),
                &new,
                &FieldMap::new(),
                &gateway,
            )
            .await;

        assert_eq!(gateway.calls.lock().unwrap().len(), 3);
        assert_eq!(report.applied_count(), 2);
        assert_eq!(report.updated, vec!["medium".to_string(), "title".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].field, "creator");
        assert!(report.failed[0].message.contains("locked"));
    }

    #[tokio::test]
    async fn nothing_to_do_is_not_an_error() {
        let reconciler = FieldReconciler::new("keywords");
        let gateway = RecordingGateway::new(None);
        let current = fields(&[("title", "Y")]);

        let report = reconciler
            .reconcile(&ResourceId::from("7"), &RecordId::from("R7"), &current, &current, &gateway)
            .await;

        assert!(report.is_in_sync());
        assert_eq!(report.applied_count(), 0);
        assert!(gateway.calls.lock().unwrap().is_empty());
    }
}
