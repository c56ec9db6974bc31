// service/chat_filter.rs
//
// Classifies chat messages that try to move a deal off the platform.
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterCategory {
    Phone,
    Social,
    Fraud,
    Email,
    Contact,
}

impl FilterCategory {
    pub fn to_str(self) -> &'static str {
        match self {
            FilterCategory::Phone => "phone",
            FilterCategory::Social => "social",
            FilterCategory::Fraud => "fraud",
            FilterCategory::Email => "email",
            FilterCategory::Contact => "contact",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterResult {
    pub blocked: bool,
    pub reason: Option<String>,
    pub category: Option<FilterCategory>,
}

impl FilterResult {
    fn pass() -> Self {
        FilterResult {
            blocked: false,
            reason: None,
            category: None,
        }
    }

    fn block(category: FilterCategory, reason: &str) -> Self {
        FilterResult {
            blocked: true,
            reason: Some(reason.to_string()),
            category: Some(category),
        }
    }
}

lazy_static! {
    /// Indian mobile numbers with an optional +91 / 91 / 0 prefix.
    static ref PHONE_REGEX: Regex = Regex::new(
        r"(?P<pre>^|\D)(?P<num>(?:\+?91[\s\-]?|0)?[6-9]\d{4}[\s\-]?\d{5})(?P<post>\D|$)"
    )
    .unwrap();

    /// Eight or more digits broken up by spaces, dots or dashes. A run only
    /// counts when its digits spell a mobile number, see [`is_disguised_mobile`].
    static ref SPACED_DIGITS_REGEX: Regex = Regex::new(r"\d(?:[\s.\-]*\d){7,}").unwrap();

    /// Six or more spelled-out digits in a row ("nine eight seven ...").
    static ref DIGIT_WORDS_REGEX: Regex = Regex::new(
        r"(?i)\b(?:zero|oh|one|two|three|four|five|six|seven|eight|nine)(?:[\s,.\-]+(?:zero|oh|one|two|three|four|five|six|seven|eight|nine)){5,}\b"
    )
    .unwrap();

    static ref FRAUD_REGEX: Regex = Regex::new(
        r"(?i)\b(?:advance\s+payment|advance\s+fee|registration\s+(?:fee|charges?)|security\s+deposit|processing\s+fee|joining\s+fee|pay\s+(?:me\s+)?first|send\s+(?:me\s+)?money|(?:share|send|give)\s+(?:me\s+)?(?:your\s+)?(?:upi|bank\s+details|account\s+number|ifsc|otp)|upi\s+id|bank\s+details|otp\s+(?:batao|bhejo|share\s+karo)|paise\s+pehle)\b"
    )
    .unwrap();

    static ref MESSAGING_APP_REGEX: Regex = Regex::new(
        r"(?i)\b(?:whats\s*app|watsapp|telegram|wechat|viber|signal\s+app|on\s+signal|imo\s+app)\b|\bwa\.me\b|\bt\.me/"
    )
    .unwrap();

    static ref CONTACT_REQUEST_REGEX: Regex = Regex::new(
        r"(?i)\b(?:call\s+me|ring\s+me|give\s+(?:me\s+)?your\s+(?:number|phone)|share\s+(?:your\s+)?(?:number|phone\s+number|contact)|send\s+(?:me\s+)?your\s+number|mujhe\s+call\s+karo|call\s+karo|phone\s+karo|number\s+do|number\s+bhejo|apna\s+number|mera\s+number)\b"
    )
    .unwrap();

    static ref EMAIL_REGEX: Regex =
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap();

    static ref SOCIAL_HANDLE_REGEX: Regex = Regex::new(
        r"(?i)(?:^|\s)@[a-z0-9_.]{3,}|\b(?:insta(?:gram)?|facebook|fb|snapchat|linkedin)\s*(?:id|handle|page)\b|\b(?:insta(?:gram)?|facebook|fb|snapchat|linkedin)\s*[:\-]?\s*@[a-z0-9_.]+|\bdm\s+me\b"
    )
    .unwrap();
}

/// True when the digits of a spaced-out run join into an Indian mobile number
/// (10 digits starting 6-9, optionally prefixed by 0 or 91). Two round
/// figures such as "60000 - 75000" read as an amount range instead.
fn is_disguised_mobile(run: &str) -> bool {
    let groups: Vec<&str> = run
        .split(|c: char| !c.is_ascii_digit())
        .filter(|g| !g.is_empty())
        .collect();

    if groups.len() == 2 && groups.iter().all(|g| g.len() >= 3 && g.ends_with("00")) {
        return false;
    }

    let digits = groups.concat();
    let national = match digits.len() {
        10 => &digits[..],
        11 if digits.starts_with('0') => &digits[1..],
        12 if digits.starts_with("91") => &digits[2..],
        _ => return false,
    };

    matches!(national.as_bytes().first(), Some(b'6'..=b'9'))
}

/// Runs the ordered checks; the first match decides the verdict.
pub fn filter_message(text: &str) -> FilterResult {
    if PHONE_REGEX.is_match(text) {
        return FilterResult::block(
            FilterCategory::Phone,
            "Sharing phone numbers is not allowed. Please keep communication on the platform.",
        );
    }

    let spaced_mobile = SPACED_DIGITS_REGEX
        .find_iter(text)
        .any(|run| is_disguised_mobile(run.as_str()));
    if spaced_mobile || DIGIT_WORDS_REGEX.is_match(text) {
        return FilterResult::block(
            FilterCategory::Phone,
            "Message appears to contain a disguised phone number.",
        );
    }

    // Fraud outranks app mentions, which outrank plain contact requests.
    if FRAUD_REGEX.is_match(text) {
        return FilterResult::block(
            FilterCategory::Fraud,
            "Requests for upfront fees, deposits or banking details are not allowed. Payments go through escrow.",
        );
    }

    if MESSAGING_APP_REGEX.is_match(text) {
        return FilterResult::block(
            FilterCategory::Social,
            "Moving the conversation to other messaging apps is not allowed.",
        );
    }

    if CONTACT_REQUEST_REGEX.is_match(text) {
        return FilterResult::block(
            FilterCategory::Contact,
            "Asking for personal contact details is not allowed. Please use in-app chat.",
        );
    }

    if EMAIL_REGEX.is_match(text) {
        return FilterResult::block(
            FilterCategory::Email,
            "Sharing email addresses is not allowed.",
        );
    }

    if SOCIAL_HANDLE_REGEX.is_match(text) {
        return FilterResult::block(
            FilterCategory::Social,
            "Sharing social media handles is not allowed.",
        );
    }

    FilterResult::pass()
}

/// Redacts phone numbers and email addresses regardless of the filter verdict.
pub fn mask_contact_info(text: &str) -> String {
    let mut masked = EMAIL_REGEX.replace_all(text, "[email hidden]").into_owned();

    // Adjacent numbers share a boundary character, so repeat until none remain.
    while PHONE_REGEX.is_match(&masked) {
        masked = PHONE_REGEX
            .replace_all(&masked, "${pre}[phone hidden]${post}")
            .into_owned();
    }

    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(text: &str) -> Option<FilterCategory> {
        let result = filter_message(text);
        assert_eq!(result.blocked, result.category.is_some());
        result.category
    }

    #[test]
    fn test_phone_number_blocked() {
        assert_eq!(category("call me on 9876543210"), Some(FilterCategory::Phone));
        assert_eq!(category("my no. +91 98765 43210"), Some(FilterCategory::Phone));
        assert_eq!(category("09876543210"), Some(FilterCategory::Phone));
    }

    #[test]
    fn test_messaging_app_blocked() {
        assert_eq!(category("let's talk on whatsapp"), Some(FilterCategory::Social));
        assert_eq!(category("ping me on Telegram"), Some(FilterCategory::Social));
        assert_eq!(category("link: wa.me/xyz"), Some(FilterCategory::Social));
    }

    #[test]
    fn test_fraud_bait_blocked() {
        assert_eq!(category("send registration fee first"), Some(FilterCategory::Fraud));
        assert_eq!(category("Security deposit of 2000 needed"), Some(FilterCategory::Fraud));
        assert_eq!(category("please share your UPI"), Some(FilterCategory::Fraud));
    }

    #[test]
    fn test_fraud_outranks_apps_and_contact() {
        assert_eq!(
            category("pay first then call me on whatsapp"),
            Some(FilterCategory::Fraud)
        );
        assert_eq!(category("call me on whatsapp"), Some(FilterCategory::Social));
    }

    #[test]
    fn test_phone_outranks_keywords() {
        assert_eq!(
            category("whatsapp me at 9876543210"),
            Some(FilterCategory::Phone)
        );
    }

    #[test]
    fn test_obfuscated_digits_blocked() {
        assert_eq!(category("9 8 7 6 5 4 3 2 1 0"), Some(FilterCategory::Phone));
        assert_eq!(category("98.765.432.10"), Some(FilterCategory::Phone));
        assert_eq!(category("98765 - 43210"), Some(FilterCategory::Phone));
        assert_eq!(category("+91 9 8 7 6 5 4 3 2 1 0"), Some(FilterCategory::Phone));
        assert_eq!(
            category("nine eight seven six five four three two"),
            Some(FilterCategory::Phone)
        );
    }

    #[test]
    fn test_disguised_mobile_shapes() {
        assert!(is_disguised_mobile("98-76-54-32-10"));
        assert!(is_disguised_mobile("0 98765 43210"));
        assert!(!is_disguised_mobile("12-03-2025"));
        assert!(!is_disguised_mobile("10000 - 15000"));
        assert!(!is_disguised_mobile("60000 - 75000"));
        // ten digits, but not a mobile prefix
        assert!(!is_disguised_mobile("12 34 56 78 90"));
    }

    #[test]
    fn test_hindi_contact_requests_blocked() {
        assert_eq!(category("mujhe call karo"), Some(FilterCategory::Contact));
        assert_eq!(category("apna number do"), Some(FilterCategory::Contact));
        assert_eq!(category("share your number please"), Some(FilterCategory::Contact));
    }

    #[test]
    fn test_email_and_handles_blocked() {
        assert_eq!(category("mail ravi@example.com"), Some(FilterCategory::Email));
        assert_eq!(category("follow @ravi_builds"), Some(FilterCategory::Social));
        assert_eq!(category("DM me"), Some(FilterCategory::Social));
    }

    #[test]
    fn test_clean_messages_pass() {
        for text in [
            "looking forward to working with you",
            "The job is in Kothrud, pincode 411038",
            "I can start at 9am, rate is 800 per day",
            "Work starts 12/03/2025",
            "Work starts 12-03-2025",
            "Budget is Rs 10000 - 15000",
            "Monthly pay 60000 - 75000 depending on experience",
            "Site visit 12.03.2025 at 10",
            "Someone will bring the tools",
        ] {
            assert_eq!(filter_message(text), FilterResult::pass(), "{}", text);
        }
    }

    #[test]
    fn test_blocked_result_carries_reason() {
        let result = filter_message("send registration fee first");
        assert!(result.blocked);
        assert!(result.reason.is_some());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["category"], "fraud");
        assert_eq!(result.category.map(FilterCategory::to_str), Some("fraud"));
    }

    #[test]
    fn test_mask_contact_info() {
        assert_eq!(
            mask_contact_info("reach me at 9876543210 or ravi@example.com"),
            "reach me at [phone hidden] or [email hidden]"
        );
        assert_eq!(
            mask_contact_info("9876543210,9123456789"),
            "[phone hidden],[phone hidden]"
        );
        assert_eq!(mask_contact_info("see you at 10am"), "see you at 10am");
    }
}
