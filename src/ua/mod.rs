use crate::domain::DeviceType;

/// Classify a raw user-agent string into a coarse device bucket.
///
/// Case-insensitive substring match, first hit wins: mobile, android
/// or iphone → mobile; ipad or tablet → tablet; anything else →
/// desktop. A missing or empty user agent is unknown.
pub fn classify_device(user_agent: Option<&str>) -> DeviceType {
    let ua = match user_agent {
        Some(s) if !s.is_empty() => s.to_lowercase(),
        _ => return DeviceType::Unknown,
    };

    if ua.contains("mobile") || ua.contains("android") || ua.contains("iphone") {
        DeviceType::Mobile
    } else if ua.contains("ipad") || ua.contains("tablet") {
        DeviceType::Tablet
    } else {
        DeviceType::Desktop
    }
}
