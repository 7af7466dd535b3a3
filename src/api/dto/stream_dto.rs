//! Streaming endpoint query parameters.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::GroupId;

/// Query string of `GET /stream/{userId}`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StreamParams {
    /// Comma-separated group memberships granted to this stream.
    #[serde(default)]
    pub groups: Option<String>,
}

impl StreamParams {
    /// Parses the `groups` list, skipping blank entries.
    #[must_use]
    pub fn group_ids(&self) -> Vec<GroupId> {
        self.groups
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(GroupId::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_groups() {
        let params = StreamParams {
            groups: Some(" zone_1, ,ops ".to_string()),
        };
        assert_eq!(
            params.group_ids(),
            vec![GroupId::from("zone_1"), GroupId::from("ops")]
        );
        assert!(StreamParams::default().group_ids().is_empty());
    }
}
