//! Tag and merge-field derivation — drives downstream marketing
//! automation (sequence enrollment, segmentation, personalization).
//!
//! Pure: same submission + score + kind always produce the same tags in
//! the same order. Tags are deduplicated with insertion order preserved;
//! the first two are always `intake-<kind>` and `date-YYYY-MM-DD`.

use serde_json::{Map, Value};

use crate::intake::scoring::LeadScore;
use crate::intake::{IntakeKind, Submission, ci_contains};

/// Derived tags and merge fields for one contact.
#[derive(Debug, Clone)]
pub struct TagSet {
    pub tags: Vec<String>,
    pub merge_fields: Map<String, Value>,
}

/// Ordered, deduplicating tag list.
struct Tags(Vec<String>);

impl Tags {
    fn push(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.0.contains(&tag) {
            self.0.push(tag);
        }
    }
}

/// Derive the full tag set and merge fields for a scored submission.
pub fn derive(sub: &Submission, score: &LeadScore, kind: IntakeKind) -> TagSet {
    let mut tags = Tags(Vec::new());

    tags.push(format!("intake-{kind}"));
    tags.push(format!("date-{}", sub.received_at.format("%Y-%m-%d")));

    push_priority_tags(&mut tags, score);

    match kind {
        IntakeKind::EstateIntake => push_estate_tags(sub, &mut tags),
        IntakeKind::BusinessFormation => push_business_tags(sub, &mut tags),
        IntakeKind::BrandProtection => push_brand_tags(sub, &mut tags),
        IntakeKind::OutsideCounsel => push_counsel_tags(sub, &mut tags),
        IntakeKind::LegalStrategyBuilder => {
            tags.push("assessment-complete");
            tags.push("sequence-strategy-followup");
        }
        IntakeKind::LegalGuideDownload => {
            tags.push("guide-download");
            tags.push("sequence-guide-nurture");
        }
        IntakeKind::ChatIntake => {
            tags.push("chat-lead");
            tags.push("sequence-chat-followup");
        }
    }

    TagSet {
        tags: tags.0,
        merge_fields: merge_fields(sub, score, kind),
    }
}

fn push_priority_tags(tags: &mut Tags, score: &LeadScore) {
    if score.score >= 70 {
        tags.push("high-priority");
        tags.push("score-high");
        tags.push("trigger-vip-sequence");
        tags.push("notify-drew-immediately");
    } else if score.score >= 50 {
        tags.push("medium-priority");
        tags.push("score-medium");
        tags.push("trigger-premium-nurture");
    } else {
        tags.push("standard-priority");
        tags.push("score-low");
        tags.push("trigger-standard-nurture");
    }
}

fn push_estate_tags(sub: &Submission, tags: &mut Tags) {
    tags.push("industry-estate-planning");

    let gross = estate_value(sub.field("grossEstate"));
    if gross > 5_000_000.0 {
        tags.push("very-wealthy");
        tags.push("sequence-estate-tax");
    } else if gross > 2_000_000.0 {
        tags.push("wealthy");
        tags.push("sequence-wealth-preservation");
    } else if gross > 1_000_000.0 {
        tags.push("comfortable");
        tags.push("sequence-trust-planning");
    } else {
        tags.push("modest-assets");
        tags.push("sequence-basic-estate");
    }

    let package = sub.field("packagePreference");
    if ci_contains(package, "trust") {
        tags.push("wants-trust");
    }
    if ci_contains(package, "will") {
        tags.push("wants-will");
    }

    if sub.field("ownBusiness") == "Yes" {
        tags.push("business-owner");
        tags.push("sequence-business-succession");
    }
    if ci_contains(sub.field("maritalStatus"), "married") {
        tags.push("married-couple");
    }
}

fn push_business_tags(sub: &Submission, tags: &mut Tags) {
    tags.push("industry-business-formation");

    match sub.field("investmentPlan") {
        "vc" => {
            tags.push("funded-startup");
            tags.push("sequence-vc-startup");
        }
        "angel" => {
            tags.push("angel-backed");
            tags.push("sequence-angel-startup");
        }
        _ => tags.push("sequence-formation-basics"),
    }

    if sub.field("businessGoal") == "startup" {
        tags.push("new-founder");
    }

    let package = sub.field("selectedPackage").to_lowercase();
    if ["bronze", "silver", "gold"].contains(&package.as_str()) {
        tags.push(format!("package-{package}"));
    }
}

fn push_brand_tags(sub: &Submission, tags: &mut Tags) {
    tags.push("industry-brand-protection");

    let goal = sub.field("protectionGoal");
    if ci_contains(goal, "enforcement") {
        tags.push("needs-enforcement");
        tags.push("sequence-ip-enforcement");
    } else if ci_contains(goal, "trademark") {
        tags.push("wants-trademark");
        tags.push("sequence-trademark-registration");
    } else if ci_contains(goal, "portfolio") {
        tags.push("portfolio-builder");
        tags.push("sequence-ip-portfolio");
    } else {
        tags.push("needs-clearance");
        tags.push("sequence-trademark-search");
    }

    if ci_contains(sub.field("businessStage"), "mature") {
        tags.push("established-business");
    }
}

fn push_counsel_tags(sub: &Submission, tags: &mut Tags) {
    tags.push("industry-outside-counsel");

    if ci_contains(sub.field("budget"), "10k+") {
        tags.push("big-budget");
    }
    if sub.field("timeline") == "Immediately" {
        tags.push("ready-to-engage");
    }
    let stage = sub.field("stage");
    if stage == "growth" || stage == "scale" {
        tags.push("growth-company");
    }
    tags.push("sequence-fractional-gc");
}

fn merge_fields(sub: &Submission, score: &LeadScore, kind: IntakeKind) -> Map<String, Value> {
    let mut fields = Map::new();
    let (first, last) = sub.name_parts();

    fields.insert("FNAME".into(), Value::String(first));
    fields.insert("LNAME".into(), Value::String(last));
    fields.insert("EMAIL".into(), Value::String(sub.email().to_string()));
    fields.insert("PHONE".into(), Value::String(sub.phone().to_string()));
    fields.insert("BUSINESS".into(), Value::String(business_name(sub)));
    fields.insert("LEAD_SCORE".into(), Value::from(score.score));
    fields.insert("PRIORITY".into(), Value::String(score.priority().into()));
    fields.insert(
        "SERVICE_TYPE".into(),
        Value::String(kind.as_str().replace('-', " ")),
    );
    fields.insert(
        "SIGNUP_DATE".into(),
        Value::String(sub.received_at.format("%Y-%m-%d").to_string()),
    );
    fields.insert("LEAD_SOURCE".into(), Value::String(lead_source(sub)));

    let mut extra = |name: &str, key: &str| {
        if sub.has(key) {
            fields.insert(name.into(), Value::String(sub.field(key).to_string()));
        }
    };
    match kind {
        IntakeKind::EstateIntake => {
            extra("ESTATE_AMOUNT", "grossEstate");
            extra("PACKAGE", "packagePreference");
        }
        IntakeKind::BusinessFormation => {
            extra("STARTUP_TYPE", "businessType");
            extra("INVESTMENT", "investmentPlan");
            extra("PACKAGE", "selectedPackage");
        }
        IntakeKind::BrandProtection => {
            extra("BP_GOAL", "protectionGoal");
            extra("BP_SCOPE", "geographicScope");
        }
        IntakeKind::OutsideCounsel => {
            extra("OC_BUDGET", "budget");
            extra("OC_TIMELINE", "timeline");
        }
        IntakeKind::LegalStrategyBuilder => {
            extra("ASSESSMENT_SCORE", "assessmentScore");
        }
        _ => {}
    }

    fields
}

fn business_name(sub: &Submission) -> String {
    for key in ["businessName", "companyName", "business", "company"] {
        if sub.has(key) {
            return sub.field(key).to_string();
        }
    }
    String::new()
}

fn lead_source(sub: &Submission) -> String {
    for key in ["conversionSource", "source"] {
        if sub.has(key) {
            return sub.field(key).to_string();
        }
    }
    "website".to_string()
}

/// Same lenient parse as the scorer (strip `$`, `,`, whitespace; 0 on failure).
fn estate_value(raw: &str) -> f64 {
    raw.chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect::<String>()
        .parse()
        .unwrap_or(0.0)
}
