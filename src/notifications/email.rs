//! System email service for account and booking emails.
//!
//! Uses the SMTP configuration from the main config file and renders
//! multipart HTML + plain-text bodies inline.

use anyhow::Result;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::EmailConfig;

/// Service for sending system emails
#[derive(Clone)]
pub struct SystemEmailService {
    config: EmailConfig,
    public_url: String,
}

impl SystemEmailService {
    pub fn new(config: EmailConfig, public_url: String) -> Self {
        Self { config, public_url }
    }

    /// Check if email sending is configured and enabled
    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    /// Send the email-verification link after registration
    pub async fn send_verification_email(
        &self,
        to_email: &str,
        name: &str,
        token: &str,
    ) -> Result<()> {
        if !self.is_enabled() {
            tracing::warn!("Email not configured, skipping verification email to {}", to_email);
            return Ok(());
        }

        let verify_url = format!(
            "{}/verify-email?email={}&token={}",
            self.public_url, to_email, token
        );
        let html_body = render_panel(
            "Verify your email",
            &format!(
                "<p>Hi <strong>{}</strong>,</p>\
                 <p>Welcome to Rentr. Confirm your email address to activate your account.</p>\
                 {}",
                name,
                render_button("Verify email", &verify_url)
            ),
        );
        let text_body = format!(
            "Hi {},\n\nWelcome to Rentr. Confirm your email address to activate your account:\n\n{}\n",
            name, verify_url
        );

        self.send_email(to_email, "Verify your Rentr account", &html_body, &text_body)
            .await
    }

    /// Send a password reset link
    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        name: &str,
        token: &str,
    ) -> Result<()> {
        if !self.is_enabled() {
            tracing::warn!("Email not configured, skipping reset email to {}", to_email);
            return Ok(());
        }

        let reset_url = format!(
            "{}/reset-password?email={}&token={}",
            self.public_url, to_email, token
        );
        let html_body = render_panel(
            "Reset your password",
            &format!(
                "<p>Hi <strong>{}</strong>,</p>\
                 <p>We received a request to reset your password. The link below expires soon; \
                 if you didn't ask for this you can ignore this email.</p>\
                 {}",
                name,
                render_button("Reset password", &reset_url)
            ),
        );
        let text_body = format!(
            "Hi {},\n\nWe received a request to reset your password:\n\n{}\n\nIf you didn't ask for this you can ignore this email.\n",
            name, reset_url
        );

        self.send_email(to_email, "Reset your Rentr password", &html_body, &text_body)
            .await
    }

    /// Tell the guest their booking has been confirmed
    #[allow(clippy::too_many_arguments)]
    pub async fn send_booking_confirmed_email(
        &self,
        to_email: &str,
        name: &str,
        property_name: &str,
        room_name: &str,
        check_in: &str,
        check_out: &str,
        total_price: i64,
    ) -> Result<()> {
        if !self.is_enabled() {
            tracing::warn!("Email not configured, skipping confirmation email to {}", to_email);
            return Ok(());
        }

        let details = [
            ("Property", property_name.to_string()),
            ("Room", room_name.to_string()),
            ("Check-in", check_in.to_string()),
            ("Check-out", check_out.to_string()),
            ("Total", total_price.to_string()),
        ];
        let html_body = render_panel(
            "Booking confirmed",
            &format!(
                "<p>Hi <strong>{name}</strong>,</p>\
                 <p>Your payment has been accepted and your stay is confirmed.</p>\
                 {}\
                 <p>We look forward to hosting you.</p>",
                render_details(&details),
            ),
        );
        let text_body = format!(
            "Hi {name},\n\nYour payment has been accepted and your stay is confirmed.\n\n\
             Property:  {property_name}\nRoom:      {room_name}\nCheck-in:  {check_in}\n\
             Check-out: {check_out}\nTotal:     {total_price}\n",
        );

        self.send_email(to_email, "Your booking is confirmed", &html_body, &text_body)
            .await
    }

    /// Tell the guest their payment proof was rejected
    pub async fn send_payment_rejected_email(
        &self,
        to_email: &str,
        name: &str,
        property_name: &str,
        deadline: &str,
    ) -> Result<()> {
        if !self.is_enabled() {
            tracing::warn!("Email not configured, skipping rejection email to {}", to_email);
            return Ok(());
        }

        let html_body = render_panel(
            "Payment proof rejected",
            &format!(
                "<p>Hi <strong>{name}</strong>,</p>\
                 <p>The host of <strong>{property_name}</strong> could not verify your payment \
                 proof. Please upload a new one before <strong>{deadline}</strong> or the booking \
                 will be cancelled.</p>",
            ),
        );
        let text_body = format!(
            "Hi {name},\n\nThe host of {property_name} could not verify your payment proof.\n\
             Please upload a new one before {deadline} or the booking will be cancelled.\n",
        );

        self.send_email(to_email, "Action needed: payment proof rejected", &html_body, &text_body)
            .await
    }

    /// Remind the guest about tomorrow's check-in
    pub async fn send_checkin_reminder_email(
        &self,
        to_email: &str,
        name: &str,
        property_name: &str,
        check_in: &str,
    ) -> Result<()> {
        if !self.is_enabled() {
            tracing::warn!("Email not configured, skipping reminder email to {}", to_email);
            return Ok(());
        }

        let html_body = render_panel(
            "Your stay is coming up",
            &format!(
                "<p>Hi <strong>{name}</strong>,</p>\
                 <p>A reminder that your stay at <strong>{property_name}</strong> starts on \
                 <strong>{check_in}</strong>. Safe travels!</p>",
            ),
        );
        let text_body = format!(
            "Hi {name},\n\nA reminder that your stay at {property_name} starts on {check_in}. Safe travels!\n",
        );

        self.send_email(to_email, "Check-in reminder", &html_body, &text_body)
            .await
    }

    fn smtp_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let host = self
            .config
            .smtp_host
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("SMTP host not configured"))?;

        let builder = if self.config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        }
        .port(self.config.smtp_port);

        let builder = match (&self.config.smtp_username, &self.config.smtp_password) {
            (Some(user), Some(pass)) => {
                builder.credentials(Credentials::new(user.clone(), pass.clone()))
            }
            _ => builder,
        };

        Ok(builder.build())
    }

    /// Send an email with HTML and plain text versions
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<()> {
        let from_address = self
            .config
            .from_address
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("From address not configured"))?;

        let from: Mailbox = format!("{} <{}>", self.config.from_name, from_address).parse()?;

        let email = Message::builder()
            .from(from)
            .to(to_email.parse()?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.smtp_transport()?.send(email).await?;

        tracing::info!(to = %to_email, subject = %subject, "Email sent");

        Ok(())
    }
}

/// Wrap body HTML in the shared panel layout.
///
/// Table-based so the layout survives the common email clients.
fn render_panel(title: &str, body_html: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
</head>
<body style="margin:0;padding:0;background:#f0f4f3;font-family:-apple-system,'Segoe UI',Roboto,Arial,sans-serif;">
    <table role="presentation" width="100%" cellpadding="0" cellspacing="0">
        <tr><td align="center" style="padding:36px 16px;">
            <table role="presentation" width="560" cellpadding="0" cellspacing="0"
                   style="background:#ffffff;border-radius:10px;overflow:hidden;">
                <tr><td style="background:#0d9488;padding:28px 32px;">
                    <h1 style="margin:0;color:#ffffff;font-size:22px;font-weight:600;">{title}</h1>
                </td></tr>
                <tr><td style="padding:28px 32px;color:#334155;font-size:15px;line-height:1.6;">
                    {body_html}
                </td></tr>
                <tr><td style="padding:20px 32px;border-top:1px solid #e2e8f0;color:#94a3b8;font-size:12px;text-align:center;">
                    Sent by Rentr &middot; please do not reply to this email
                </td></tr>
            </table>
        </td></tr>
    </table>
</body>
</html>"#,
    )
}

fn render_button(label: &str, url: &str) -> String {
    format!(
        r#"<p style="text-align:center;margin:28px 0;"><a href="{url}" style="background:#0d9488;color:#ffffff;text-decoration:none;padding:13px 30px;border-radius:6px;font-weight:500;display:inline-block;">{label}</a></p>"#,
    )
}

/// Key/value rows for booking details
fn render_details(rows: &[(&str, String)]) -> String {
    let body: String = rows
        .iter()
        .map(|(label, value)| {
            format!(
                r#"<tr><td style="padding:6px 0;color:#64748b;font-size:14px;">{label}</td><td align="right" style="padding:6px 0;color:#0f172a;font-weight:500;">{value}</td></tr>"#
            )
        })
        .collect();
    format!(
        r#"<table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="background:#f8fafc;border-radius:8px;margin:18px 0;padding:10px 16px;">{body}</table>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_panel_includes_title_and_body() {
        let html = render_panel("Booking confirmed", "<p>hello</p>");
        assert!(html.contains("Booking confirmed"));
        assert!(html.contains("<p>hello</p>"));
    }

    #[test]
    fn test_render_details_rows() {
        let html = render_details(&[("Check-in", "2026-06-10".to_string())]);
        assert!(html.contains("Check-in"));
        assert!(html.contains("2026-06-10"));
    }

    #[test]
    fn test_disabled_service_skips_sending() {
        let service = SystemEmailService::new(EmailConfig::default(), "http://localhost".into());
        assert!(!service.is_enabled());

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        // Unconfigured SMTP short-circuits to Ok without a network call
        rt.block_on(async {
            service
                .send_checkin_reminder_email("guest@example.com", "Guest", "Villa", "2026-06-10")
                .await
                .unwrap();
        });
    }
}
