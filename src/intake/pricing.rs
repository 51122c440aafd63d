//! Fixed price lookup tables, surfaced in the intake response and in
//! confirmation emails.

use crate::intake::{IntakeKind, Submission, ci_contains};

/// A price estimate: a fixed dollar amount (estate, business) or a
/// display string for ranged/custom quotes (brand protection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceEstimate {
    Fixed(u32),
    Display(String),
}

impl PriceEstimate {
    /// Rendering used in emails.
    pub fn display(&self) -> String {
        match self {
            Self::Fixed(amount) => format!("${amount}"),
            Self::Display(s) => s.clone(),
        }
    }
}

/// Kind-specific price estimate, when the submission carries enough
/// signal to compute one.
pub fn estimate(sub: &Submission, kind: IntakeKind) -> Option<PriceEstimate> {
    match kind {
        IntakeKind::EstateIntake => estate_price(sub),
        IntakeKind::BusinessFormation => business_price(sub),
        IntakeKind::BrandProtection => brand_price(sub),
        _ => None,
    }
}

fn estate_price(sub: &Submission) -> Option<PriceEstimate> {
    let package = sub.field("packagePreference");
    let married = ci_contains(sub.field("maritalStatus"), "married");

    let amount = if ci_contains(package, "trust") {
        if married { 3650 } else { 2900 }
    } else if ci_contains(package, "will") {
        if married { 1900 } else { 1500 }
    } else {
        return None;
    };
    Some(PriceEstimate::Fixed(amount))
}

fn business_price(sub: &Submission) -> Option<PriceEstimate> {
    let amount = match sub.field("selectedPackage").to_lowercase().as_str() {
        "bronze" => 2995,
        "silver" => 4995,
        "gold" => 7995,
        _ => return None,
    };
    Some(PriceEstimate::Fixed(amount))
}

fn brand_price(sub: &Submission) -> Option<PriceEstimate> {
    let service = sub.field("servicePreference");

    let display = if ci_contains(service, "clearance") {
        "$1,495"
    } else if ci_contains(service, "single") {
        "$2,495"
    } else if ci_contains(service, "multiple") {
        "$4,995+"
    } else if ci_contains(service, "portfolio") || ci_contains(service, "7500") {
        "$7,500+"
    } else if sub.field("protectionGoal") == "enforcement"
        || ci_contains(service, "enforcement")
    {
        "Custom Quote"
    } else {
        return None;
    };
    Some(PriceEstimate::Display(display.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(fields: &[(&str, &str)]) -> Submission {
        Submission::from_fields(fields.iter().copied())
    }

    #[test]
    fn estate_trust_pricing_by_marital_status() {
        let married = sub(&[
            ("packagePreference", "Trust"),
            ("maritalStatus", "Married"),
        ]);
        assert_eq!(
            estimate(&married, IntakeKind::EstateIntake),
            Some(PriceEstimate::Fixed(3650))
        );

        let single = sub(&[("packagePreference", "Trust"), ("maritalStatus", "Single")]);
        assert_eq!(
            estimate(&single, IntakeKind::EstateIntake),
            Some(PriceEstimate::Fixed(2900))
        );
    }

    #[test]
    fn estate_will_pricing() {
        let married = sub(&[("packagePreference", "Will"), ("maritalStatus", "Married")]);
        assert_eq!(
            estimate(&married, IntakeKind::EstateIntake),
            Some(PriceEstimate::Fixed(1900))
        );

        let single = sub(&[("packagePreference", "Will")]);
        assert_eq!(
            estimate(&single, IntakeKind::EstateIntake),
            Some(PriceEstimate::Fixed(1500))
        );
    }

    #[test]
    fn business_package_tiers() {
        for (package, amount) in [("bronze", 2995), ("silver", 4995), ("gold", 7995)] {
            let s = sub(&[("selectedPackage", package)]);
            assert_eq!(
                estimate(&s, IntakeKind::BusinessFormation),
                Some(PriceEstimate::Fixed(amount))
            );
        }
        assert_eq!(
            estimate(&sub(&[]), IntakeKind::BusinessFormation),
            None
        );
    }

    #[test]
    fn brand_portfolio_shows_ranged_price() {
        let s = sub(&[("servicePreference", "Portfolio-7500")]);
        assert_eq!(
            estimate(&s, IntakeKind::BrandProtection),
            Some(PriceEstimate::Display("$7,500+".into()))
        );
    }

    #[test]
    fn brand_enforcement_is_custom_quote() {
        let s = sub(&[("protectionGoal", "enforcement")]);
        assert_eq!(
            estimate(&s, IntakeKind::BrandProtection),
            Some(PriceEstimate::Display("Custom Quote".into()))
        );
    }

    #[test]
    fn no_estimate_for_other_kinds() {
        let s = sub(&[("packagePreference", "Trust")]);
        assert_eq!(estimate(&s, IntakeKind::OutsideCounsel), None);
        assert_eq!(estimate(&s, IntakeKind::LegalGuideDownload), None);
    }

    #[test]
    fn display_formats_fixed_amounts() {
        assert_eq!(PriceEstimate::Fixed(1900).display(), "$1900");
        assert_eq!(
            PriceEstimate::Display("Custom Quote".into()).display(),
            "Custom Quote"
        );
    }
}
