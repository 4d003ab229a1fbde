//! Credential resolution from the process environment.
//!
//! The provider block only names a target environment (`CMS`, `OPSB` or
//! `APM`); the address and API credentials for it come from
//! `UCMDB_<TARGET>_ADDRESS`, `UCMDB_<TARGET>_API_USER` and
//! `UCMDB_<TARGET>_API_PASSWORD`.

use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;

use crate::error::ProviderError;

/// A UCMDB deployment the provider can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetEnv {
    /// Configuration Management System.
    Cms,
    /// Operations Bridge.
    Opsb,
    /// Application Performance Management.
    Apm,
}

impl TargetEnv {
    /// All accepted targets, in the order they are listed in errors.
    pub const ALL: [TargetEnv; 3] = [TargetEnv::Cms, TargetEnv::Opsb, TargetEnv::Apm];

    /// The uppercased tag used in environment variable names.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetEnv::Cms => "CMS",
            TargetEnv::Opsb => "OPSB",
            TargetEnv::Apm => "APM",
        }
    }

    fn variable(self, suffix: &str) -> String {
        format!("UCMDB_{}_{}", self.as_str(), suffix)
    }

    /// Name of the variable holding the UCMDB base address.
    pub fn address_var(self) -> String {
        self.variable("ADDRESS")
    }

    /// Name of the variable holding the API user.
    pub fn user_var(self) -> String {
        self.variable("API_USER")
    }

    /// Name of the variable holding the API password.
    pub fn password_var(self) -> String {
        self.variable("API_PASSWORD")
    }
}

impl fmt::Display for TargetEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetEnv {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                ProviderError::Configuration(format!(
                    "expected target_env to be one of [{}], got {}",
                    names.join(" "),
                    s
                ))
            })
    }
}

/// Connection settings for one UCMDB target.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Base URL of the UCMDB server.
    pub address: String,
    /// API user name.
    pub user: String,
    /// API password.
    pub password: SecretString,
}

/// Resolve credentials for `target` from the process environment.
///
/// A variable that is set counts as present even when its value is not
/// valid UTF-8; such values are converted lossily.
pub fn resolve_credentials(target: TargetEnv) -> Result<Credentials, ProviderError> {
    resolve_credentials_with(target, |name| {
        std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
    })
}

/// Resolve credentials for `target` through an arbitrary variable lookup.
///
/// Fails if any of the three variables is unset, or if any is blank after
/// trimming. Both errors list all three variable names. Values are returned
/// as found.
pub fn resolve_credentials_with<F>(
    target: TargetEnv,
    lookup: F,
) -> Result<Credentials, ProviderError>
where
    F: Fn(&str) -> Option<String>,
{
    let names = [target.address_var(), target.user_var(), target.password_var()];
    let listed = names.join(", ");

    let (Some(address), Some(user), Some(password)) =
        (lookup(&names[0]), lookup(&names[1]), lookup(&names[2]))
    else {
        return Err(ProviderError::Configuration(format!(
            "the following environment variables must be set: {}",
            listed
        )));
    };

    if [&address, &user, &password].iter().any(|v| v.trim().is_empty()) {
        return Err(ProviderError::Configuration(format!(
            "the following environment variables must not have empty values: {}",
            listed
        )));
    }

    Ok(Credentials {
        address,
        user,
        password: SecretString::new(password.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_target_env_parsing_ignores_case() {
        assert_eq!("cms".parse::<TargetEnv>().unwrap(), TargetEnv::Cms);
        assert_eq!("Opsb".parse::<TargetEnv>().unwrap(), TargetEnv::Opsb);
        assert_eq!("APM".parse::<TargetEnv>().unwrap(), TargetEnv::Apm);
    }

    #[test]
    fn test_target_env_rejects_unknown() {
        let err = "PROD".parse::<TargetEnv>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: expected target_env to be one of [CMS OPSB APM], got PROD"
        );
    }

    #[test]
    fn test_variable_names() {
        assert_eq!(TargetEnv::Opsb.address_var(), "UCMDB_OPSB_ADDRESS");
        assert_eq!(TargetEnv::Opsb.user_var(), "UCMDB_OPSB_API_USER");
        assert_eq!(TargetEnv::Opsb.password_var(), "UCMDB_OPSB_API_PASSWORD");
    }

    #[test]
    fn test_resolve_with_all_set() {
        let creds = resolve_credentials_with(
            TargetEnv::Cms,
            lookup_from(&[
                ("UCMDB_CMS_ADDRESS", "https://ucmdb.example:8443"),
                ("UCMDB_CMS_API_USER", "admin"),
                ("UCMDB_CMS_API_PASSWORD", " pw "),
            ]),
        )
        .unwrap();

        assert_eq!(creds.address, "https://ucmdb.example:8443");
        assert_eq!(creds.user, "admin");
        assert_eq!(creds.password.expose_secret(), " pw ");
    }

    #[test]
    fn test_resolve_with_missing_variable() {
        let err = resolve_credentials_with(
            TargetEnv::Cms,
            lookup_from(&[
                ("UCMDB_CMS_ADDRESS", "https://ucmdb.example"),
                ("UCMDB_CMS_API_USER", "admin"),
            ]),
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Configuration error: the following environment variables must be set: \
             UCMDB_CMS_ADDRESS, UCMDB_CMS_API_USER, UCMDB_CMS_API_PASSWORD"
        );
    }

    #[test]
    fn test_resolve_with_blank_variable() {
        let err = resolve_credentials_with(
            TargetEnv::Apm,
            lookup_from(&[
                ("UCMDB_APM_ADDRESS", "https://ucmdb.example"),
                ("UCMDB_APM_API_USER", "   "),
                ("UCMDB_APM_API_PASSWORD", "pw"),
            ]),
        )
        .unwrap_err();

        assert!(err.to_string().contains(
            "must not have empty values: \
             UCMDB_APM_ADDRESS, UCMDB_APM_API_USER, UCMDB_APM_API_PASSWORD"
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials {
            address: "https://ucmdb.example".into(),
            user: "admin".into(),
            password: SecretString::new("hunter2".into()),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    #[serial]
    fn test_resolve_from_process_environment() {
        temp_env::with_vars(
            [
                ("UCMDB_OPSB_ADDRESS", Some("https://opsb.example")),
                ("UCMDB_OPSB_API_USER", Some("svc")),
                ("UCMDB_OPSB_API_PASSWORD", Some("pw")),
            ],
            || {
                let creds = resolve_credentials(TargetEnv::Opsb).unwrap();
                assert_eq!(creds.address, "https://opsb.example");
                assert_eq!(creds.user, "svc");
            },
        );
    }

    #[test]
    #[serial]
    fn test_resolve_from_process_environment_unset() {
        temp_env::with_vars_unset(
            [
                "UCMDB_APM_ADDRESS",
                "UCMDB_APM_API_USER",
                "UCMDB_APM_API_PASSWORD",
            ],
            || {
                let err = resolve_credentials(TargetEnv::Apm).unwrap_err();
                assert!(matches!(err, ProviderError::Configuration(_)));
            },
        );
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_non_utf8_variable_counts_as_set() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        temp_env::with_vars(
            [
                ("UCMDB_CMS_ADDRESS", Some(OsStr::new("https://ucmdb.example"))),
                ("UCMDB_CMS_API_USER", Some(OsStr::new("admin"))),
                ("UCMDB_CMS_API_PASSWORD", Some(OsStr::from_bytes(b"pw\xff"))),
            ],
            || {
                let creds = resolve_credentials(TargetEnv::Cms).unwrap();
                assert_eq!(creds.password.expose_secret(), "pw\u{FFFD}");
            },
        );
    }
}
