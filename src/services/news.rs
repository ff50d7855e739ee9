use chrono::{DateTime, NaiveDateTime};

use super::{html, FetchError};
use crate::models::news::NewsContent;

const HUB_MARKER: &str = "tudo-sobre";

/// First `a.href-title` link pointing at a "tudo sobre" hub.
pub fn parse_news_hub_url(page: &str) -> Option<String> {
    html::find_elements(page, "a")
        .into_iter()
        .filter(|a| a.has_class("href-title"))
        .filter_map(|a| a.attr("href"))
        .find(|href| href.contains(HUB_MARKER))
        .map(html::decode_entities)
}

/// The link of every small news card on a hub page, in page order.
pub fn parse_news_urls(page: &str) -> Vec<String> {
    html::find_by_attr(page, "div", "data-ds-component", "card-sm")
        .into_iter()
        .filter_map(|card| html::find_first(card.inner, "a"))
        .filter_map(|a| a.attr("href"))
        .filter(|href| !href.is_empty())
        .map(html::decode_entities)
        .collect()
}

/// Title, body text and publication time of an article page.
pub fn parse_article(page: &str, url: &str) -> Result<NewsContent, FetchError> {
    let parse_error = |reason: &str| FetchError::Parse {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let article = html::find_by_attr(page, "article", "data-ds-component", "article")
        .into_iter()
        .next()
        .ok_or_else(|| parse_error("article body not found"))?;

    let title = html::find_first(page, "h1")
        .map(|h1| h1.text())
        .filter(|t| !t.is_empty());

    let author = html::find_by_attr(page, "div", "data-ds-component", "author-small")
        .into_iter()
        .next()
        .ok_or_else(|| parse_error("author block not found"))?;
    let raw_date = html::find_first(author.inner, "time")
        .and_then(|time| time.attr("datetime"))
        .ok_or_else(|| parse_error("publication time not found"))?;
    let published_date = parse_published_date(raw_date)
        .ok_or_else(|| parse_error(&format!("invalid publication time '{raw_date}'")))?;

    Ok(NewsContent {
        title,
        content: article.text(),
        published_date,
    })
}

/// ISO-8601 timestamp, normalised to naive UTC when it carries an offset.
pub fn parse_published_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const STOCK_PAGE: &str = r#"
        <div class="quotes">
          <a class="href-title" href="https://www.infomoney.com.br/cotacoes/b3/acao/petrobras-petr4/">Cotação</a>
          <a class="card href-title" href="https://www.infomoney.com.br/tudo-sobre/petrobras/">Tudo sobre Petrobras</a>
          <a class="href-title" href="https://www.infomoney.com.br/tudo-sobre/outra/">Outra</a>
        </div>"#;

    const HUB_PAGE: &str = r#"
        <section>
          <div data-ds-component="card-sm" class="card">
            <div class="img"><a href="https://www.infomoney.com.br/mercados/petrobras-lucro/"><img src="x.jpg"/></a></div>
            <a href="https://www.infomoney.com.br/mercados/ignored/">second link</a>
          </div>
          <div data-ds-component="card-lg"><a href="https://www.infomoney.com.br/big/">big</a></div>
          <div data-ds-component="card-sm"><span>no link</span></div>
          <div data-ds-component="card-sm"><a href="https://www.infomoney.com.br/onde-investir/dividendos/?a=1&amp;b=2">Dividendos</a></div>
        </section>"#;

    const ARTICLE_PAGE: &str = r#"
        <html><body>
          <h1 class="title">Petrobras  anuncia <em>dividendos</em></h1>
          <div data-ds-component="author-small">
            <span>Por Redação</span>
            <time datetime="2025-05-13T18:30:00-03:00">13/05/2025 18h30</time>
          </div>
          <article data-ds-component="article">
            <p>A Petrobras aprovou o pagamento.</p>
            <script>trackArticle();</script>
            <p>Os acionistas recebem em junho.</p>
          </article>
        </body></html>"#;

    #[test]
    fn hub_url_is_first_href_title_with_marker() {
        assert_eq!(
            parse_news_hub_url(STOCK_PAGE).as_deref(),
            Some("https://www.infomoney.com.br/tudo-sobre/petrobras/")
        );
        assert_eq!(parse_news_hub_url("<a href=\"/tudo-sobre/x\">x</a>"), None);
    }

    #[test]
    fn hub_link_is_found_despite_lookalike_attributes_and_case() {
        let page = r#"<A TITLE="veja class=destaque" Class="href-title" HREF="/tudo-sobre/vale/">Vale</A>"#;
        assert_eq!(parse_news_hub_url(page).as_deref(), Some("/tudo-sobre/vale/"));

        let decoy = r#"<a title="class=href-title" href="/tudo-sobre/vale/">Vale</a>"#;
        assert_eq!(parse_news_hub_url(decoy), None);
    }

    #[test]
    fn news_urls_take_the_first_link_of_each_small_card() {
        assert_eq!(
            parse_news_urls(HUB_PAGE),
            vec![
                "https://www.infomoney.com.br/mercados/petrobras-lucro/".to_string(),
                "https://www.infomoney.com.br/onde-investir/dividendos/?a=1&b=2".to_string(),
            ]
        );
    }

    #[test]
    fn article_fields_are_extracted() {
        let content = parse_article(ARTICLE_PAGE, "https://x").unwrap();

        assert_eq!(content.title.as_deref(), Some("Petrobras anuncia dividendos"));
        assert_eq!(
            content.content,
            "A Petrobras aprovou o pagamento. Os acionistas recebem em junho."
        );
        assert_eq!(
            content.published_date,
            NaiveDate::from_ymd_opt(2025, 5, 13)
                .unwrap()
                .and_hms_opt(21, 30, 0)
                .unwrap()
        );
    }

    #[test]
    fn article_without_body_is_a_parse_error() {
        let err = parse_article("<h1>t</h1>", "https://x/a").unwrap_err();
        assert!(matches!(err, FetchError::Parse { ref url, .. } if url == "https://x/a"));
    }

    #[test]
    fn accepts_naive_publication_times() {
        assert_eq!(
            parse_published_date("2025-01-02T03:04:05"),
            NaiveDate::from_ymd_opt(2025, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, 5)
        );
        assert_eq!(parse_published_date("yesterday"), None);
    }
}
