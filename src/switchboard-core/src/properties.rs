//! Default request properties sent along with a configuration download.

use serde_json::Value;

use crate::entity::Values;

pub const UUID: &str = "uuid";
pub const OS: &str = "os";
pub const OS_VERSION: &str = "os_version";
pub const DEVICE: &str = "device";
pub const LANG: &str = "lang";
pub const COUNTRY: &str = "country";
pub const MANUFACTURER: &str = "manufacturer";
pub const APP_ID: &str = "appId";
pub const VERSION: &str = "version";
pub const BUILD: &str = "build";
pub const INSTALL_ID: &str = "installId";

const UNKNOWN: &str = "unknown";

/// Identity of the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub app_id: String,
    pub version: String,
    pub build: String,
}

impl AppInfo {
    pub fn new(
        app_id: impl Into<String>,
        version: impl Into<String>,
        build: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            version: version.into(),
            build: build.into(),
        }
    }
}

/// Build the default user-data map for a configuration request.
pub fn default_properties(uuid: &str, install_id: &str, app: &AppInfo) -> Values {
    let locale = std::env::var("LC_ALL")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var("LANG").ok());
    let (lang, country) = parse_locale(locale.as_deref().unwrap_or_default());

    let entries = [
        (UUID, uuid.to_string()),
        (OS, std::env::consts::OS.to_string()),
        (OS_VERSION, os_version()),
        (DEVICE, std::env::consts::ARCH.to_string()),
        (LANG, lang),
        (COUNTRY, country),
        (MANUFACTURER, UNKNOWN.to_string()),
        (APP_ID, app.app_id.clone()),
        (VERSION, app.version.clone()),
        (BUILD, app.build.clone()),
        (INSTALL_ID, install_id.to_string()),
    ];
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), Value::String(value)))
        .collect()
}

/// Split a POSIX locale such as `en_US.UTF-8` into language and region.
pub fn parse_locale(locale: &str) -> (String, String) {
    let base = locale.split(['.', '@']).next().unwrap_or_default();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return (UNKNOWN.to_string(), UNKNOWN.to_string());
    }
    let mut parts = base.split(['_', '-']);
    let lang = parts.next().filter(|s| !s.is_empty()).unwrap_or(UNKNOWN);
    let country = parts.next().filter(|s| !s.is_empty()).unwrap_or(UNKNOWN);
    (lang.to_string(), country.to_string())
}

fn os_version() -> String {
    #[cfg(target_os = "linux")]
    {
        if let Ok(release) = std::fs::read_to_string("/proc/sys/kernel/osrelease") {
            return release.trim().to_string();
        }
    }
    UNKNOWN.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locale() {
        assert_eq!(
            parse_locale("en_US.UTF-8"),
            ("en".to_string(), "US".to_string())
        );
        assert_eq!(
            parse_locale("de"),
            ("de".to_string(), "unknown".to_string())
        );
        assert_eq!(
            parse_locale("C"),
            ("unknown".to_string(), "unknown".to_string())
        );
        assert_eq!(
            parse_locale(""),
            ("unknown".to_string(), "unknown".to_string())
        );
    }

    #[test]
    fn test_default_properties_keys() {
        let app = AppInfo::new("com.example.app", "1.2.0", "42");
        let props = default_properties("user-1", "install-1", &app);

        assert_eq!(props[UUID], "user-1");
        assert_eq!(props[INSTALL_ID], "install-1");
        assert_eq!(props[APP_ID], "com.example.app");
        assert_eq!(props[BUILD], "42");
        for key in [OS, OS_VERSION, DEVICE, LANG, COUNTRY, MANUFACTURER, VERSION] {
            assert!(props.contains_key(key), "missing {key}");
        }
    }
}
