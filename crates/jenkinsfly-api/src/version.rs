// Jenkins protocol dialect selection.
//
// The two dialects differ in how the CSRF crumb travels: 1.x servers read
// it from the `.crumb` header, 2.x servers from `Jenkins-Crumb`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which wire-protocol dialect to speak to the server.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum JenkinsVersion {
    /// Jenkins 1.x.
    #[default]
    #[strum(to_string = "version1", serialize = "1", serialize = "v1")]
    Version1,
    /// Jenkins 2.x and later.
    #[strum(to_string = "version2", serialize = "2", serialize = "v2")]
    Version2,
}

impl JenkinsVersion {
    /// Header carrying the crumb for this dialect.
    pub fn crumb_header(self) -> &'static str {
        match self {
            Self::Version1 => ".crumb",
            Self::Version2 => "Jenkins-Crumb",
        }
    }
}
