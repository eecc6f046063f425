//! Best-effort User-Agent classification.
//!
//! Pure string matching with no external calls; good enough for audit
//! metadata, not for feature detection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Opera,
    Other,
}

impl core::fmt::Display for Browser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Browser::Chrome => "Chrome",
            Browser::Firefox => "Firefox",
            Browser::Safari => "Safari",
            Browser::Edge => "Edge",
            Browser::Opera => "Opera",
            Browser::Other => "Other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingSystem {
    Windows,
    MacOs,
    Linux,
    Android,
    Ios,
    Other,
}

impl core::fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            OperatingSystem::Windows => "Windows",
            OperatingSystem::MacOs => "MacOS",
            OperatingSystem::Linux => "Linux",
            OperatingSystem::Android => "Android",
            OperatingSystem::Ios => "iOS",
            OperatingSystem::Other => "Other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl core::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            DeviceType::Mobile => "MOBILE",
            DeviceType::Tablet => "TABLET",
            DeviceType::Desktop => "DESKTOP",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgentProfile {
    pub browser: Browser,
    pub os: OperatingSystem,
    pub device_type: DeviceType,
}

impl Default for UserAgentProfile {
    fn default() -> Self {
        Self {
            browser: Browser::Other,
            os: OperatingSystem::Other,
            device_type: DeviceType::Desktop,
        }
    }
}

/// Classify a raw User-Agent header value.
///
/// Match order matters: Edge and Opera ship `chrome` in their UA strings,
/// and Chrome ships `safari`, so the more specific products are checked
/// first.
pub fn classify(user_agent: Option<&str>) -> UserAgentProfile {
    let Some(ua) = user_agent else {
        return UserAgentProfile::default();
    };
    let ua = ua.to_ascii_lowercase();
    if ua.is_empty() {
        return UserAgentProfile::default();
    }

    let browser = if ua.contains("edg") {
        Browser::Edge
    } else if ua.contains("opr") || ua.contains("opera") {
        Browser::Opera
    } else if ua.contains("firefox") {
        Browser::Firefox
    } else if ua.contains("chrome") {
        Browser::Chrome
    } else if ua.contains("safari") {
        Browser::Safari
    } else {
        Browser::Other
    };

    // Android UAs contain "linux"; iPhone/iPad UAs contain "mac os".
    let os = if ua.contains("android") {
        OperatingSystem::Android
    } else if ua.contains("iphone") || ua.contains("ipad") {
        OperatingSystem::Ios
    } else if ua.contains("windows") {
        OperatingSystem::Windows
    } else if ua.contains("mac os") {
        OperatingSystem::MacOs
    } else if ua.contains("linux") {
        OperatingSystem::Linux
    } else {
        OperatingSystem::Other
    };

    let device_type = if ua.contains("tablet") || ua.contains("ipad") {
        DeviceType::Tablet
    } else if ua.contains("mobile") || ua.contains("iphone") {
        DeviceType::Mobile
    } else {
        DeviceType::Desktop
    };

    UserAgentProfile {
        browser,
        os,
        device_type,
    }
}
