//! Immutable rule tables for the normalization and categorization engines
//!
//! All tables are plain configuration values handed to the engines at
//! construction, so tests can substitute alternate rule sets and the engines
//! stay deterministic.

/// Two-letter abbreviations for the 50 US states, matched against the last
/// whitespace-delimited token of a merchant string.
pub const US_STATES: [&str; 50] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY",
];

/// Noise-stripping configuration for the merchant normalizer
#[derive(Debug, Clone)]
pub struct NormalizerRules {
    /// Payment-processor prefixes stripped from the start of a description
    /// (compared after uppercasing)
    pub processor_prefixes: Vec<String>,
    /// Minimum digit-run length treated as a trailing reference/transaction ID
    pub min_reference_digits: usize,
}

impl Default for NormalizerRules {
    fn default() -> Self {
        Self {
            processor_prefixes: ["FSP*", "TST*", "CTLP*", "SQ *", "SP *", "APLPAY "]
                .into_iter()
                .map(String::from)
                .collect(),
            min_reference_digits: 5,
        }
    }
}

/// One entry of the ordered keyword rule table
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub category: String,
    /// Lowercase substrings matched against the lowercased description
    pub keywords: Vec<String>,
}

impl KeywordRule {
    fn new(category: &str, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

/// Rule tables for the categorization engine
///
/// Keyword rules are an ordered sequence: the first category with a matching
/// keyword wins, so more specific categories must be listed before generic
/// ones. The bank-category map normalizes issuer-supplied category names to
/// canonical ones.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    rules: Vec<KeywordRule>,
    bank_categories: Vec<(String, String)>,
}

impl CategoryRules {
    pub fn new(rules: Vec<KeywordRule>, bank_categories: Vec<(String, String)>) -> Self {
        Self {
            rules,
            bank_categories,
        }
    }

    /// First category whose keyword set contains a substring of `description`
    pub fn match_keywords(&self, description: &str) -> Option<&str> {
        let desc = description.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| desc.contains(k.as_str())))
            .map(|rule| rule.category.as_str())
    }

    /// Map an issuer-supplied category to a canonical one, if the table knows it
    pub fn map_bank_category(&self, bank_category: &str) -> Option<&str> {
        let wanted = bank_category.trim();
        self.bank_categories
            .iter()
            .find(|(issuer, _)| issuer.eq_ignore_ascii_case(wanted))
            .map(|(_, canonical)| canonical.as_str())
    }

    /// The ordered rule table (exposed for display/editing surfaces)
    pub fn keyword_rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}

impl Default for CategoryRules {
    fn default() -> Self {
        // Order matters: more specific categories come first, and Transfer is
        // last so its broad payment keywords cannot shadow real spending.
        let rules = vec![
            KeywordRule::new(
                "Income",
                &[
                    "payroll",
                    "salary",
                    "interest paid",
                    "cashback",
                    "refund",
                    "reimbursement",
                ],
            ),
            KeywordRule::new("Travel", &["airbnb", "vrbo", "booking.com", "hotel"]),
            KeywordRule::new(
                "Airlines",
                &[
                    "american airlines",
                    "delta",
                    "united airlines",
                    "southwest",
                    "jetblue",
                    "airline",
                ],
            ),
            KeywordRule::new(
                "Software/Tech",
                &[
                    "github",
                    "aws",
                    "google cloud",
                    "vercel",
                    "digitalocean",
                    "supabase",
                    "anthropic",
                    "openai",
                ],
            ),
            KeywordRule::new(
                "Subscriptions",
                &[
                    "membership fee",
                    "spotify",
                    "netflix",
                    "hulu",
                    "apple music",
                    "youtube premium",
                    "apple.com/bill",
                    "nytimes",
                ],
            ),
            KeywordRule::new(
                "Insurance",
                &["geico", "state farm", "progressive", "blue cross", "insurance"],
            ),
            KeywordRule::new(
                "Grocery",
                &[
                    "grocery",
                    "food lion",
                    "kroger",
                    "whole foods",
                    "trader joe",
                    "publix",
                    "safeway",
                    "harris teeter",
                    "wegmans",
                ],
            ),
            KeywordRule::new(
                "Dining",
                &[
                    "restaurant",
                    "cafe",
                    "coffee",
                    "starbucks",
                    "pizza",
                    "burger",
                    "grill",
                    "bistro",
                    "diner",
                    // Toast point-of-sale prefix shows up on most restaurant cards
                    "tst*",
                ],
            ),
            KeywordRule::new(
                "Shopping",
                &[
                    "amazon",
                    "amazon mktpl",
                    "target",
                    "walmart",
                    "retail",
                    "store",
                    "mall",
                ],
            ),
            KeywordRule::new(
                "Gas",
                &[
                    "shell",
                    "exxon",
                    "bp ",
                    "chevron",
                    "circle k",
                    "citgo",
                    "sunoco",
                    "wawa",
                    "fuel",
                    "gas station",
                ],
            ),
            KeywordRule::new(
                "Sports/Exercise",
                &["gym", "fitness", "yoga", "crossfit", "peloton", "strava", "athletic"],
            ),
            KeywordRule::new(
                "Transportation",
                &["uber", "lyft", "transit", "parking", "toll"],
            ),
            KeywordRule::new(
                "Utilities",
                &[
                    "comcast",
                    "xfinity",
                    "electric",
                    "power",
                    "water",
                    "internet",
                    "verizon",
                    "at&t",
                    "cellular",
                ],
            ),
            KeywordRule::new(
                "Healthcare",
                &["pharmacy", "cvs", "walgreens", "medical", "doctor", "hospital", "dental"],
            ),
            KeywordRule::new("Entertainment", &["movie", "theater", "concert", "tickets"]),
            KeywordRule::new(
                "Transfer",
                &[
                    "check paid",
                    "check deposit",
                    "mobile payment",
                    "autopay payment",
                    "venmo",
                    "zelle",
                    "transfer to",
                    "transfer from",
                    "funds transfer",
                    "payment received",
                    "epayment",
                ],
            ),
        ];

        // Issuer category names as card networks report them
        let bank_categories = [
            ("Restaurants", "Dining"),
            ("Food and Drink", "Dining"),
            ("Groceries", "Grocery"),
            ("Gas Stations", "Gas"),
            ("Entertainment", "Entertainment"),
            ("Shopping", "Shopping"),
            ("Travel", "Travel"),
            ("Transportation", "Transportation"),
            ("Health and Fitness", "Healthcare"),
            ("Services", "Other"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        Self::new(rules, bank_categories)
    }
}
