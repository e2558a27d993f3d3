use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Email pattern - RFC 5322 simplified, anchored
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").unwrap();

    // Indian mobile numbers: optional +91 / 91 / 0 prefix, then 10 digits starting 6-9
    static ref IN_MOBILE_REGEX: Regex = Regex::new(r"^(\+?91|0)?[6-9]\d{9}$").unwrap();
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_REGEX.is_match(value.trim())
}

pub fn is_valid_mobile(value: &str) -> bool {
    IN_MOBILE_REGEX.is_match(value.trim())
}
