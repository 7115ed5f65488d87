use crate::domain::image::ImageRecord;
use crate::infra::storage::StorageBackend;

pub const SITE_NAME: &str = "Imglet";

/// One Open Graph image entry: absolute URL plus declared dimensions, which
/// preview crawlers require up front in the first HTML response.
#[derive(Debug, Clone)]
pub struct PreviewImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub alt: String,
}

/// Crawler-facing metadata for a short-link page. An unknown short id still
/// gets a payload — a "not found" title with no image entries.
#[derive(Debug, Clone)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub images: Vec<PreviewImage>,
}

/// Build the metadata payload for a resolved record. The primary entry is
/// the 1200x630 landscape card; a square fallback is added only when the
/// backend can actually derive one by URL transformation.
pub fn for_record(
    record: &ImageRecord,
    base_url: &str,
    storage: &dyn StorageBackend,
) -> PageMetadata {
    let alt = record.file_name.clone();
    let primary_url = storage
        .preview_variant(&record.image_url, 1200, 630)
        .unwrap_or_else(|| record.image_url.clone());

    let mut images = vec![PreviewImage {
        url: primary_url,
        width: 1200,
        height: 630,
        alt: alt.clone(),
    }];
    if let Some(square) = storage.preview_variant(&record.image_url, 600, 600) {
        images.push(PreviewImage {
            url: square,
            width: 600,
            height: 600,
            alt,
        });
    }

    PageMetadata {
        title: format!("{} · {}", record.file_name, SITE_NAME),
        description: format!("Click to view {}.", record.file_name),
        canonical_url: record.short_url(base_url),
        images,
    }
}

pub fn not_found(short_id: &str, base_url: &str) -> PageMetadata {
    PageMetadata {
        title: format!("Image not found · {}", SITE_NAME),
        description: "No image exists for this link.".to_string(),
        canonical_url: format!("{}/img/{}", base_url.trim_end_matches('/'), short_id),
        images: Vec::new(),
    }
}

/// Render the full HTML shell served to crawlers (and to humans on the
/// not-found path). Metadata lives in `<head>`; the body is a minimal
/// server-rendered view with no scripts.
pub fn render_page(meta: &PageMetadata, record: Option<&ImageRecord>) -> String {
    let mut head = String::new();
    head.push_str(&format!("<title>{}</title>\n", escape(&meta.title)));
    head.push_str(&format!(
        "<meta name=\"description\" content=\"{}\">\n",
        escape(&meta.description)
    ));
    head.push_str(&format!(
        "<link rel=\"canonical\" href=\"{}\">\n",
        escape(&meta.canonical_url)
    ));
    head.push_str(&format!(
        "<meta property=\"og:title\" content=\"{}\">\n",
        escape(&meta.title)
    ));
    head.push_str(&format!(
        "<meta property=\"og:description\" content=\"{}\">\n",
        escape(&meta.description)
    ));
    head.push_str(&format!(
        "<meta property=\"og:url\" content=\"{}\">\n",
        escape(&meta.canonical_url)
    ));
    head.push_str(&format!(
        "<meta property=\"og:site_name\" content=\"{}\">\n",
        SITE_NAME
    ));
    head.push_str("<meta property=\"og:type\" content=\"website\">\n");

    for image in &meta.images {
        head.push_str(&format!(
            "<meta property=\"og:image\" content=\"{}\">\n",
            escape(&image.url)
        ));
        head.push_str(&format!(
            "<meta property=\"og:image:width\" content=\"{}\">\n",
            image.width
        ));
        head.push_str(&format!(
            "<meta property=\"og:image:height\" content=\"{}\">\n",
            image.height
        ));
        head.push_str(&format!(
            "<meta property=\"og:image:alt\" content=\"{}\">\n",
            escape(&image.alt)
        ));
    }

    if let Some(primary) = meta.images.first() {
        head.push_str("<meta name=\"twitter:card\" content=\"summary_large_image\">\n");
        head.push_str(&format!(
            "<meta name=\"twitter:title\" content=\"{}\">\n",
            escape(&meta.title)
        ));
        head.push_str(&format!(
            "<meta name=\"twitter:description\" content=\"{}\">\n",
            escape(&meta.description)
        ));
        head.push_str(&format!(
            "<meta name=\"twitter:image\" content=\"{}\">\n",
            escape(&primary.url)
        ));
    }

    let body = match record {
        Some(record) => format!(
            "<main>\n<h1>{}</h1>\n<img src=\"{}\" alt=\"{}\">\n\
             <p><a href=\"{}\" rel=\"noopener noreferrer\">View original</a></p>\n</main>",
            escape(&record.file_name),
            escape(&record.image_url),
            escape(&record.file_name),
            escape(&record.image_url)
        ),
        None => "<main>\n<h1>Image not found</h1>\n\
                 <p>No image exists for this link. It may have been mistyped.</p>\n</main>"
            .to_string(),
    };

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         {}</head>\n<body>\n{}\n</body>\n</html>\n",
        head, body
    )
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::InlineStorage;
    use anyhow::Result;
    use async_trait::async_trait;
    use bytes::Bytes;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn record() -> ImageRecord {
        ImageRecord {
            id: Uuid::new_v4(),
            short_id: "abcd1234".to_string(),
            file_name: "cat.png".to_string(),
            file_key: None,
            image_url: "https://cdn.example.com/images/abcd1234.png".to_string(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    struct TransformingBackend;

    #[async_trait]
    impl crate::infra::storage::StorageBackend for TransformingBackend {
        async fn store(
            &self,
            _data: Bytes,
            _content_type: &str,
            _key: &str,
        ) -> Result<crate::infra::storage::StoredObject> {
            unreachable!("metadata tests never store bytes")
        }

        fn preview_variant(&self, image_url: &str, width: u32, height: u32) -> Option<String> {
            Some(format!("{}?w={}&h={}", image_url, width, height))
        }
    }

    #[test]
    fn primary_entry_is_landscape_card() {
        let meta = for_record(&record(), "https://pics.example.com", &InlineStorage);
        assert_eq!(meta.images.len(), 1);
        assert_eq!(meta.images[0].width, 1200);
        assert_eq!(meta.images[0].height, 630);
        assert_eq!(meta.images[0].url, record().image_url);
        assert_eq!(meta.canonical_url, "https://pics.example.com/img/abcd1234");
    }

    #[test]
    fn transforming_backend_adds_square_fallback() {
        let meta = for_record(&record(), "https://pics.example.com", &TransformingBackend);
        assert_eq!(meta.images.len(), 2);
        assert!(meta.images[0].url.ends_with("?w=1200&h=630"));
        assert_eq!(meta.images[1].width, 600);
        assert_eq!(meta.images[1].height, 600);
    }

    #[test]
    fn title_and_description_derive_from_file_name() {
        let meta = for_record(&record(), "https://pics.example.com", &InlineStorage);
        assert!(meta.title.contains("cat.png"));
        assert!(meta.description.contains("cat.png"));
    }

    #[test]
    fn rendered_page_carries_og_and_twitter_tags() {
        let rec = record();
        let meta = for_record(&rec, "https://pics.example.com", &InlineStorage);
        let html = render_page(&meta, Some(&rec));
        assert!(html.contains("og:image"));
        assert!(html.contains("og:image:width"));
        assert!(html.contains("summary_large_image"));
        assert!(html.contains("rel=\"canonical\""));
        assert!(html.contains("<img src="));
    }

    #[test]
    fn not_found_payload_has_no_image_entries() {
        let meta = not_found("nonexistent123", "https://pics.example.com");
        assert!(meta.images.is_empty());
        let html = render_page(&meta, None);
        assert!(!html.contains("og:image"));
        assert!(!html.contains("twitter:card"));
        assert!(html.contains("Image not found"));
    }

    #[test]
    fn file_names_are_html_escaped() {
        let mut rec = record();
        rec.file_name = "<script>alert(1)</script>.png".to_string();
        let meta = for_record(&rec, "https://pics.example.com", &InlineStorage);
        let html = render_page(&meta, Some(&rec));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
