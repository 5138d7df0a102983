//! WhatsApp click-to-chat links and message templates.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// `https://wa.me/<phone>?text=<message>` with the message
/// percent-encoded as a URI component.
#[must_use]
pub fn whatsapp_url(phone: &str, message: &str) -> String {
    format!(
        "https://wa.me/{phone}?text={}",
        utf8_percent_encode(message, URI_COMPONENT)
    )
}

/// Thank-you message sent to the customer after a successful order.
#[must_use]
pub fn order_confirmation(name: &str, phone: &str, total: f64) -> String {
    format!(
        "🎉 شكرًا لطلبك! {name}\n💰 الإجمالي: {total:.0} جنيه\n📞 سنتواصل معك قريبًا على: {phone}"
    )
}

/// Notification for the store with the order's item lines.
#[must_use]
pub fn order_notification(name: &str, phone: &str, details: &str) -> String {
    format!("📦 طلب جديد من {name}\n📞 {phone}\n\nتفاصيل الطلب:\n{details}")
}
