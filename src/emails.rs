//! Internal alert and client confirmation message builders.
//!
//! Pure: these only assemble `MailMessage` values. Sending (and token
//! handling) lives in `clients::graph`.

use crate::clients::graph::MailMessage;
use crate::intake::analysis::AiAnalysis;
use crate::intake::pricing::PriceEstimate;
use crate::intake::scoring::LeadScore;
use crate::intake::{IntakeKind, Submission};

/// Score at or above which a lead is treated as high value: the alert is
/// sent with high importance and copied to the high-value recipient.
pub const HIGH_VALUE_SCORE: u32 = 70;

/// Build the internal intake alert.
pub fn internal_alert(
    sub: &Submission,
    kind: IntakeKind,
    score: &LeadScore,
    analysis: &AiAnalysis,
    price: Option<&PriceEstimate>,
    notify_to: &str,
    high_value_to: Option<&str>,
) -> MailMessage {
    let high_value = score.score >= HIGH_VALUE_SCORE;

    let mut to = vec![notify_to.to_string()];
    if high_value {
        if let Some(extra) = high_value_to {
            to.push(extra.to_string());
        }
    }

    MailMessage {
        subject: alert_subject(sub, kind, score),
        html_body: alert_body(sub, kind, score, analysis, price),
        to,
        high_importance: high_value,
        attachments: sub.attachments.clone(),
    }
}

fn alert_subject(sub: &Submission, kind: IntakeKind, score: &LeadScore) -> String {
    let base = format!(
        "[LEAD {}] {} — {}",
        score.score,
        sub.display_name(),
        kind.label()
    );
    if sub.has("conversionSource") {
        format!("ASSESSMENT CONVERSION — {base}")
    } else {
        base
    }
}

fn alert_body(
    sub: &Submission,
    kind: IntakeKind,
    score: &LeadScore,
    analysis: &AiAnalysis,
    price: Option<&PriceEstimate>,
) -> String {
    let mut html = String::with_capacity(2048);
    html.push_str(&format!(
        "<h2>New {} submission</h2><p><strong>Lead score: {}/100 ({})</strong></p>",
        kind.label(),
        score.score,
        score.priority()
    ));

    if let Some(price) = price {
        html.push_str(&format!("<p>Estimated price: {}</p>", price.display()));
    }

    html.push_str("<h3>Score factors</h3><ul>");
    for factor in &score.factors {
        html.push_str(&format!("<li>{factor}</li>"));
    }
    html.push_str("</ul>");

    html.push_str("<h3>Submission</h3><table>");
    for (key, value) in sub.iter_fields() {
        html.push_str(&format!("<tr><td>{key}</td><td>{value}</td></tr>"));
    }
    html.push_str("</table>");

    if analysis.is_available() {
        html.push_str("<h3>AI analysis</h3>");
        let section = |label: &str, value: &Option<String>| match value {
            Some(text) => format!("<p><strong>{label}:</strong> {text}</p>"),
            None => String::new(),
        };
        html.push_str(&section("Strategic analysis", &analysis.analysis));
        html.push_str(&section("Recommendations", &analysis.recommendations));
        html.push_str(&section("Risk flags", &analysis.risk_flags));
        html.push_str(&section("Engagement strategy", &analysis.engagement_strategy));
        html.push_str(&section("Lifetime value", &analysis.lifetime_value));
    }

    html
}

/// Build the client confirmation, or `None` when the submission carries
/// no email address.
pub fn client_confirmation(
    sub: &Submission,
    kind: IntakeKind,
    price: Option<&PriceEstimate>,
    copy_to: Option<&str>,
    guide_url: Option<&str>,
) -> Option<MailMessage> {
    let email = sub.email();
    if email.is_empty() {
        return None;
    }

    let mut to = vec![email.to_string()];
    if let Some(copy) = copy_to {
        to.push(copy.to_string());
    }

    let (first, _) = sub.name_parts();
    let greeting = if first.is_empty() {
        "Hello".to_string()
    } else {
        format!("Hello {first}")
    };

    let mut html = format!(
        "<p>{greeting},</p><p>Thank you for your {} inquiry. Our team reviews every \
         submission personally and will reach out within one business day.</p>",
        kind.label()
    );
    if let Some(price) = price {
        html.push_str(&format!(
            "<p>Based on your answers, your estimated investment is <strong>{}</strong>.</p>",
            price.display()
        ));
    }
    if kind == IntakeKind::LegalGuideDownload {
        if let Some(url) = guide_url {
            html.push_str(&format!(
                "<p>Your guide is ready: <a href=\"{url}\">download it here</a>.</p>"
            ));
        }
    }
    html.push_str("<p>— The team</p>");

    Some(MailMessage {
        subject: format!("We received your {} inquiry", kind.label()),
        html_body: html,
        to,
        high_importance: false,
        attachments: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(fields: &[(&str, &str)], score: u32) -> (Submission, LeadScore) {
        let sub = Submission::from_fields(fields.iter().copied());
        (
            sub,
            LeadScore {
                score,
                factors: vec!["Base estate-intake: +40".into()],
            },
        )
    }

    #[test]
    fn alert_subject_includes_score_and_name() {
        let (sub, score) = scored(
            &[("firstName", "Jane"), ("lastName", "Doe")],
            65,
        );
        let msg = internal_alert(
            &sub,
            IntakeKind::EstateIntake,
            &score,
            &AiAnalysis::empty(),
            None,
            "intake@firm.com",
            None,
        );
        assert_eq!(msg.subject, "[LEAD 65] Jane Doe — Estate Planning");
        assert!(!msg.high_importance);
        assert_eq!(msg.to, vec!["intake@firm.com"]);
    }

    #[test]
    fn conversion_prefix_on_alert_subject() {
        let (mut sub, score) = scored(&[("firstName", "Jane")], 80);
        sub.set("conversionSource", "legal-strategy-builder");
        let msg = internal_alert(
            &sub,
            IntakeKind::EstateIntake,
            &score,
            &AiAnalysis::empty(),
            None,
            "intake@firm.com",
            None,
        );
        assert!(msg.subject.starts_with("ASSESSMENT CONVERSION — "));
    }

    #[test]
    fn high_value_lead_adds_recipient_and_importance() {
        let (sub, score) = scored(&[("firstName", "Jane")], 85);
        let msg = internal_alert(
            &sub,
            IntakeKind::EstateIntake,
            &score,
            &AiAnalysis::empty(),
            None,
            "intake@firm.com",
            Some("partner@firm.com"),
        );
        assert!(msg.high_importance);
        assert_eq!(msg.to, vec!["intake@firm.com", "partner@firm.com"]);
    }

    #[test]
    fn below_threshold_skips_high_value_recipient() {
        let (sub, score) = scored(&[], 69);
        let msg = internal_alert(
            &sub,
            IntakeKind::EstateIntake,
            &score,
            &AiAnalysis::empty(),
            None,
            "intake@firm.com",
            Some("partner@firm.com"),
        );
        assert_eq!(msg.to, vec!["intake@firm.com"]);
    }

    #[test]
    fn alert_body_embeds_analysis_when_available() {
        let (sub, score) = scored(&[("email", "x@firm.com")], 75);
        let analysis = AiAnalysis {
            analysis: Some("Promising estate lead.".into()),
            ..AiAnalysis::empty()
        };
        let msg = internal_alert(
            &sub,
            IntakeKind::EstateIntake,
            &score,
            &analysis,
            Some(&PriceEstimate::Fixed(3650)),
            "intake@firm.com",
            None,
        );
        assert!(msg.html_body.contains("Promising estate lead."));
        assert!(msg.html_body.contains("$3650"));
        assert!(msg.html_body.contains("Base estate-intake: +40"));
    }

    #[test]
    fn confirmation_requires_client_email() {
        let sub = Submission::new();
        assert!(client_confirmation(&sub, IntakeKind::EstateIntake, None, None, None).is_none());
    }

    #[test]
    fn confirmation_copies_notify_address() {
        let sub = Submission::from_fields([("email", "jane@acme.io"), ("firstName", "Jane")]);
        let msg = client_confirmation(
            &sub,
            IntakeKind::EstateIntake,
            None,
            Some("intake@firm.com"),
            None,
        )
        .unwrap();
        assert_eq!(msg.to, vec!["jane@acme.io", "intake@firm.com"]);
        assert!(msg.html_body.contains("Hello Jane"));
    }

    #[test]
    fn guide_confirmation_embeds_download_link() {
        let sub = Submission::from_fields([("email", "jane@acme.io")]);
        let msg = client_confirmation(
            &sub,
            IntakeKind::LegalGuideDownload,
            None,
            None,
            Some("https://cdn.example.com/guide.pdf"),
        )
        .unwrap();
        assert!(msg.html_body.contains("https://cdn.example.com/guide.pdf"));
    }
}
