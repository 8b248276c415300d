//! Review card parsing.
//!
//! Field selectors live here rather than in config: they describe the
//! internal anatomy of one card and change together when the page markup
//! shifts, unlike the page-level selectors a deployment might tune.

use std::sync::OnceLock;

use chromiumoxide::element::Element;
use regex::Regex;

use crate::domain::Review;
use crate::normalize::{self, LangCache};
use crate::scraper::locator;

const AUTHOR_SEL: &str = "div[class*=\"d4r55\"]";
const RATING_SEL: &str = "span[role=\"img\"]";
const DATE_SEL: &str = "span[class*=\"rsqaWe\"]";
const TEXT_SELECTORS: [&str; 3] = [
    "span[jsname=\"bN97Pc\"]",
    "span[jsname=\"fbQN7e\"]",
    "div.MyEned span.wiI7pd",
];
const MORE_BUTTON_SEL: &str = "button.kyuRq";
const LIKE_BUTTON_SEL: &str = "button[jsaction*=\"toggleThumbsUp\" i]";
const PHOTO_BUTTON_SEL: &str = "button.Tya61d";
const PROFILE_SEL: &str = "button[data-review-id]";
const AVATAR_SEL: &str = "button[data-review-id] img";
const OWNER_REPLY_SEL: &str = "div.CDe7pd div.wiI7pd";

fn style_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"url\("([^"]+)"\)"#).expect("valid style url pattern"))
}

/// Photo URL carried in an inline `background-image` style, if any.
pub(crate) fn photo_url_from_style(style: &str) -> Option<String> {
    style_url_re()
        .captures(style)
        .map(|captures| captures[1].to_string())
}

/// Read one review card into a record.
///
/// The caller has already read the card's id (dedupe happens before any
/// parsing). Every field read degrades to its default on failure; a card
/// going stale mid-read yields a partially filled record rather than an
/// error.
pub(crate) async fn parse(
    card: &Element,
    id: &str,
    company_name: &str,
    langs: &mut LangCache,
) -> Review {
    // Expand truncated text so the text read sees the whole review.
    for button in locator::find_all(card, MORE_BUTTON_SEL).await {
        let _ = button.click().await;
    }

    let mut review = Review::new(id, company_name);

    review.author = locator::first_non_empty_text(card, AUTHOR_SEL).await;

    let rating_label = locator::first_non_empty_attr(card, RATING_SEL, "aria-label").await;
    review.rating = normalize::first_integer(&rating_label);

    let date_phrase = locator::first_non_empty_text(card, DATE_SEL).await;
    review.published_at = normalize::relative_date_to_iso(&date_phrase);

    for selector in TEXT_SELECTORS {
        let text = locator::first_non_empty_text(card, selector).await;
        if !text.is_empty() {
            review.text = text;
            break;
        }
    }
    review.language = langs.detect(&review.text).as_str().to_string();

    let mut like_label = locator::first_non_empty_text(card, LIKE_BUTTON_SEL).await;
    if like_label.is_empty() {
        like_label = locator::first_non_empty_attr(card, LIKE_BUTTON_SEL, "aria-label").await;
    }
    review.likes = normalize::first_integer(&like_label);

    for button in locator::find_all(card, PHOTO_BUTTON_SEL).await {
        if let Ok(Some(style)) = button.attribute("style").await {
            if let Some(url) = photo_url_from_style(&style) {
                review.photos.push(url);
            }
        }
    }

    review.author_profile = locator::first_non_empty_attr(card, PROFILE_SEL, "data-href").await;
    review.avatar = locator::first_non_empty_attr(card, AVATAR_SEL, "src").await;
    review.owner_reply = locator::first_non_empty_text(card, OWNER_REPLY_SEL).await;

    review
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_url_from_style() {
        let style = "background-image: url(\"https://example.com/p/photo1.jpg\"); height: 90px;";
        assert_eq!(
            photo_url_from_style(style),
            Some("https://example.com/p/photo1.jpg".to_string())
        );
    }

    #[test]
    fn test_photo_url_absent() {
        assert_eq!(photo_url_from_style("height: 90px;"), None);
        assert_eq!(photo_url_from_style(""), None);
    }

    #[test]
    fn test_photo_url_takes_first_when_style_has_several() {
        let style = "background-image: url(\"https://a.test/1.jpg\"), url(\"https://a.test/2.jpg\");";
        assert_eq!(
            photo_url_from_style(style),
            Some("https://a.test/1.jpg".to_string())
        );
    }
}
