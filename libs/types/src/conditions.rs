use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};

/// Builds a `Condition` the way both controllers set them: freshly
/// timestamped, and always carrying the generation it was computed against
/// so that a stale read can be told apart from a current one.
pub fn build_condition(
    type_: &str,
    status: bool,
    reason: &str,
    message: impl Into<String>,
    observed_generation: i64,
) -> Condition {
    Condition {
        type_: type_.to_string(),
        status: if status { "True" } else { "False" }.to_string(),
        reason: reason.to_string(),
        message: message.into(),
        observed_generation: Some(observed_generation),
        last_transition_time: Time(Utc::now()),
    }
}

/// Finds a condition by type in a condition list, as every status reader in
/// this codebase needs to.
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}
