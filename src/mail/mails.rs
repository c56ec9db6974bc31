use super::sendmail::Mailer;
use crate::service::{error::ServiceError, otp_service::OTP_EXPIRY_MINUTES};

const OTP_TEMPLATE: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 480px; margin: auto;">
  <h2 style="color: #e8590c;">KaamSetu</h2>
  <p>Namaste {{name}},</p>
  <p>Your verification code is:</p>
  <p style="font-size: 28px; letter-spacing: 6px; font-weight: bold;">{{otp}}</p>
  <p>This code expires in {{minutes}} minutes. Never share it with anyone, including people you meet on KaamSetu.</p>
</div>"#;

const WELCOME_TEMPLATE: &str = r#"<div style="font-family: Arial, sans-serif; max-width: 480px; margin: auto;">
  <h2 style="color: #e8590c;">Welcome to KaamSetu, {{name}}!</h2>
  <p>Your {{role}} account is ready. Complete your profile to get better matches.</p>
  <p>Keep all conversations and payments on the platform so escrow can protect you.</p>
  <p><a href="{{app_url}}">Open KaamSetu</a></p>
</div>"#;

fn render(template: &str, placeholders: &[(&str, &str)]) -> String {
    placeholders
        .iter()
        .fold(template.to_string(), |html, (key, value)| html.replace(key, value))
}

pub async fn send_otp_email(
    mailer: &Mailer,
    to_email: &str,
    name: &str,
    otp: &str,
) -> Result<(), ServiceError> {
    let minutes = OTP_EXPIRY_MINUTES.to_string();
    let html = render(
        OTP_TEMPLATE,
        &[("{{name}}", name), ("{{otp}}", otp), ("{{minutes}}", &minutes)],
    );

    mailer
        .send(to_email, "Your KaamSetu verification code", &html)
        .await
}

pub async fn send_welcome_email(
    mailer: &Mailer,
    to_email: &str,
    name: &str,
    role: &str,
    app_url: &str,
) -> Result<(), ServiceError> {
    let html = render(
        WELCOME_TEMPLATE,
        &[("{{name}}", name), ("{{role}}", role), ("{{app_url}}", app_url)],
    );

    mailer.send(to_email, "Welcome to KaamSetu", &html).await
}
