use toolstate_core::{Constraint, ToolVersion};

/// Picks the newest candidate allowed by `constraint`.
///
/// Post releases never qualify. Pre and dev releases qualify only with
/// `include_prereleases`.
pub fn select_latest_release<'a>(
    candidates: &'a [ToolVersion],
    constraint: Option<&Constraint>,
    include_prereleases: bool,
) -> Option<&'a ToolVersion> {
    candidates
        .iter()
        .filter(|version| !version.is_postrelease())
        .filter(|version| include_prereleases || !version.is_prerelease())
        .filter(|version| {
            constraint.map_or(true, |req| {
                req.matches_with_prereleases(version, include_prereleases)
            })
        })
        .max()
}
