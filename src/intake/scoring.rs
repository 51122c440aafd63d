//! Lead scoring — pure, deterministic, additive point accumulation.
//!
//! Each qualifying rule adds points once and logs a human-readable factor
//! ending in `: +N`. The total is capped at 100 *as points accumulate*,
//! so the factor amounts always sum to the final score even when the raw
//! rule total would exceed the cap.

use serde::Serialize;

use crate::intake::{IntakeKind, Submission, ci_contains};

/// Maximum lead score.
pub const MAX_SCORE: u32 = 100;

/// A scored lead: total in `[0, 100]` plus one factor string per
/// contribution, in firing order.
#[derive(Debug, Clone, Serialize)]
pub struct LeadScore {
    pub score: u32,
    pub factors: Vec<String>,
}

impl LeadScore {
    /// Priority band label used by tags, merge fields, and task priority.
    pub fn priority(&self) -> &'static str {
        if self.score >= 70 {
            "HIGH"
        } else if self.score >= 50 {
            "MEDIUM"
        } else {
            "STANDARD"
        }
    }
}

/// Accumulator that caps at [`MAX_SCORE`]. Contributions past the cap are
/// trimmed to the remaining headroom; zero-point contributions are not
/// recorded as factors.
struct ScoreAcc {
    total: u32,
    factors: Vec<String>,
}

impl ScoreAcc {
    fn new() -> Self {
        Self {
            total: 0,
            factors: Vec::new(),
        }
    }

    fn add(&mut self, points: u32, description: impl AsRef<str>) {
        let applied = points.min(MAX_SCORE - self.total);
        if applied == 0 {
            return;
        }
        self.total += applied;
        self.factors
            .push(format!("{}: +{applied}", description.as_ref()));
    }

    fn finish(self) -> LeadScore {
        LeadScore {
            score: self.total,
            factors: self.factors,
        }
    }
}

/// Score a submission. Referentially transparent: no clock, no I/O.
pub fn score(submission: &Submission, kind: IntakeKind) -> LeadScore {
    let mut acc = ScoreAcc::new();

    acc.add(base_points(kind), format!("Base {kind}"));
    score_assessment_conversion(submission, &mut acc);

    match kind {
        IntakeKind::EstateIntake => score_estate(submission, &mut acc),
        IntakeKind::BusinessFormation => score_business(submission, &mut acc),
        IntakeKind::BrandProtection => score_brand(submission, &mut acc),
        IntakeKind::OutsideCounsel => score_counsel(submission, &mut acc),
        _ => {}
    }

    score_universal(submission, &mut acc);
    acc.finish()
}

fn base_points(kind: IntakeKind) -> u32 {
    match kind {
        IntakeKind::EstateIntake => 40,
        IntakeKind::BusinessFormation => 50,
        IntakeKind::BrandProtection => 35,
        IntakeKind::OutsideCounsel => 45,
        IntakeKind::LegalGuideDownload => 30,
        IntakeKind::LegalStrategyBuilder => 55,
        _ => 30,
    }
}

/// Bonus for leads arriving through the strategy-assessment funnel.
fn score_assessment_conversion(sub: &Submission, acc: &mut ScoreAcc) {
    let converted = sub.field("fromAssessment") == "true"
        || sub.field("source") == "legal-strategy-builder-conversion";
    if !converted {
        return;
    }
    acc.add(20, "Assessment conversion");

    let assessment: i64 = sub.field("assessmentScore").parse().unwrap_or(0);
    if assessment >= 70 {
        acc.add(15, "Strong assessment score");
    } else if assessment >= 50 {
        acc.add(10, "Moderate assessment score");
    }
}

fn score_estate(sub: &Submission, acc: &mut ScoreAcc) {
    // Strict greater-than: exactly $5,000,000 lands in the $2M bucket.
    let gross = parse_money(sub.field("grossEstate"));
    if gross > 5_000_000.0 {
        acc.add(50, "Gross estate over $5M");
    } else if gross > 2_000_000.0 {
        acc.add(35, "Gross estate over $2M");
    } else if gross > 1_000_000.0 {
        acc.add(25, "Gross estate over $1M");
    }

    if ci_contains(sub.field("packagePreference"), "trust") {
        acc.add(30, "Trust package preference");
    }
    if sub.field("ownBusiness") == "Yes" {
        acc.add(20, "Owns a business");
    }
    if sub.field("otherRealEstate") == "Yes" {
        acc.add(15, "Additional real estate");
    }
    if sub.field("planningGoal") == "complex" {
        acc.add(25, "Complex planning goal");
    }
}

fn score_business(sub: &Submission, acc: &mut ScoreAcc) {
    let investment = sub.field("investmentPlan");
    if investment == "vc" {
        acc.add(60, "Seeking VC funding");
    } else if investment == "angel" {
        acc.add(40, "Seeking angel funding");
    }

    let revenue = sub.field("projectedRevenue");
    if ci_contains(revenue, "over25m") {
        acc.add(50, "Projected revenue over $25M");
    } else if ci_contains(revenue, "5m-25m") {
        acc.add(35, "Projected revenue $5M-$25M");
    }

    if sub.field("businessGoal") == "startup" {
        acc.add(20, "Startup formation goal");
    }
    if sub.field("selectedPackage") == "gold" {
        acc.add(25, "Gold package selected");
    }
}

fn score_brand(sub: &Submission, acc: &mut ScoreAcc) {
    let service = sub.field("servicePreference");
    if ci_contains(service, "portfolio") || ci_contains(service, "7500") {
        acc.add(40, "Portfolio service preference");
    }
    if ci_contains(sub.field("businessStage"), "mature") {
        acc.add(20, "Mature business stage");
    }

    // Equality, not substring: "National" is a substring of "International".
    let scope = sub.field("geographicScope");
    if scope.eq_ignore_ascii_case("national") || scope.eq_ignore_ascii_case("international") {
        acc.add(25, "National or international scope");
    }
    if sub.field("protectionGoal") == "enforcement" {
        acc.add(35, "Enforcement goal");
    }
}

fn score_counsel(sub: &Submission, acc: &mut ScoreAcc) {
    let budget = sub.field("budget");
    if ci_contains(budget, "10k+") {
        acc.add(40, "Budget $10K+ per month");
    } else if ci_contains(budget, "5k-10k") {
        acc.add(25, "Budget $5K-$10K per month");
    }

    if sub.field("timeline") == "Immediately" {
        acc.add(30, "Immediate timeline");
    }

    let stage = sub.field("stage");
    if stage == "growth" || stage == "scale" {
        acc.add(20, "Growth-stage company");
    }

    if service_count(sub.field("services")) > 3 {
        acc.add(15, "Broad service needs");
    }
}

fn score_universal(sub: &Submission, acc: &mut ScoreAcc) {
    let urgency = sub.field("urgency");
    if ci_contains(urgency, "immediate") || ci_contains(urgency, "urgent") {
        acc.add(40, "Urgent timeline");
    }

    const PRIORITY_REGIONS: [&str; 6] = ["new york", "new jersey", "ohio", "ny", "nj", "oh"];
    let in_region = [sub.field("state"), sub.field("businessState")]
        .iter()
        .any(|v| PRIORITY_REGIONS.iter().any(|r| ci_contains(v, r)));
    if in_region {
        acc.add(15, "Priority state");
    }

    if let Some(domain) = email_domain(sub.email()) {
        const FREE_DOMAINS: [&str; 3] = ["gmail.com", "yahoo.com", "hotmail.com"];
        if !FREE_DOMAINS.contains(&domain.to_lowercase().as_str()) {
            acc.add(10, "Business email domain");
        }
    }
}

/// Lenient money parsing: strip `$`, `,`, whitespace; non-numeric → 0.
fn parse_money(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    cleaned.parse().unwrap_or(0.0)
}

/// The `services` field arrives as a comma-separated string.
fn service_count(raw: &str) -> usize {
    raw.split(',').filter(|s| !s.trim().is_empty()).count()
}

fn email_domain(email: &str) -> Option<&str> {
    email.split('@').nth(1).filter(|d| !d.is_empty())
}
