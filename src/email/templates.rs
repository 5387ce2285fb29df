use super::EmailMessage;

pub fn password_reset_email(to: &str, reset_url: &str, valid_for_minutes: i64) -> EmailMessage {
    let href = html_escape::encode_double_quoted_attribute(reset_url);
    EmailMessage {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        text: format!(
            "A password reset was requested for your account.\n\n\
             To choose a new password, open the following link:\n\n\
             {reset_url}\n\n\
             The link expires in {valid_for_minutes} minutes and can be used once.\n\
             If you did not request this, you can ignore this email."
        ),
        html: format!(
            "<p>A password reset was requested for your account.</p>\
             <p>To choose a new password, <a href=\"{href}\">click here</a>.</p>\
             <p>The link expires in {valid_for_minutes} minutes and can be used once. \
             If you did not request this, you can ignore this email.</p>"
        ),
    }
}

pub fn credentials_changed_email(to: &str, username: &str) -> EmailMessage {
    let html_username = html_escape::encode_text(username);
    EmailMessage {
        to: to.to_string(),
        subject: "Your account credentials were changed".to_string(),
        text: format!(
            "Hello {username},\n\n\
             The sign-in credentials for your account were just changed.\n\
             If this was not you, reset your password immediately."
        ),
        html: format!(
            "<p>Hello {html_username},</p>\
             <p>The sign-in credentials for your account were just changed.</p>\
             <p>If this was not you, reset your password immediately.</p>"
        ),
    }
}
