use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::Lazy;
use rand::Rng;

/// 1x1 transparent PNG returned in place of generated images.
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64,
    0x60, 0xf8, 0x5f, 0x0f, 0x00, 0x02, 0x87, 0x01, 0x80, 0xeb, 0x47, 0xba, 0x92, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

pub static PLACEHOLDER_IMAGE: Lazy<String> = Lazy::new(|| BASE64.encode(PLACEHOLDER_PNG));

pub const INFO_GENERATED: &str = "Изображение сгенерировано через Replicate";
pub const INFO_UNCONFIGURED: &str =
    "Используется placeholder (настройте API ключи для реальной генерации)";
const INFO_FAILED_PREFIX: &str = "Ошибка генерации: ";

pub const NO_MODEL_RESPONSE: &str = "Нет ответа от модели.";

pub fn image_failed_info(error: &str) -> String {
    format!("{INFO_FAILED_PREFIX}{error}")
}

/// Reply used when a configured LLM provider could not be reached.
pub fn apology(error: &str) -> String {
    format!(
        "Я временно недоступен (ошибка: {error}). Но игра продолжается! \
         Вы можете: 1. Исследовать мир 2. Проверить инвентарь 3. Отдохнуть"
    )
}

/// Number of local reply templates.
pub const LOCAL_TEMPLATE_COUNT: usize = 3;

/// Renders local reply template `index` around a prefix of `last_message`.
pub fn local_template(index: usize, last_message: &str) -> String {
    match index % LOCAL_TEMPLATE_COUNT {
        0 => format!(
            "В мире снов вы видите: \"{}...\". Вы чувствуете магию вокруг. Что вы хотите сделать?",
            prefix(last_message, 50)
        ),
        1 => format!(
            "\"{}...\" - интересный выбор. Вы можете: 1. Исследовать дальше 2. Осмотреться 3. Искать подсказки",
            prefix(last_message, 40)
        ),
        _ => format!(
            "В ответ на ваше действие \"{}...\" мир снов отвечает загадкой. Продолжайте ваше путешествие!",
            prefix(last_message, 30)
        ),
    }
}

pub fn local_reply_with<R: Rng + ?Sized>(last_message: &str, rng: &mut R) -> String {
    local_template(rng.gen_range(0..LOCAL_TEMPLATE_COUNT), last_message)
}

pub fn local_reply(last_message: &str) -> String {
    local_reply_with(last_message, &mut rand::thread_rng())
}

/// First `max_chars` Unicode scalar values of `text`.
///
/// Counting is per `char`, not per UTF-16 code unit, so an emoji or other
/// astral character counts once.
fn prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
