use tracing::warn;

use super::{html, ListedStock, StockListingPage};

/// Parses the XML returned by the top gainers/losers endpoint.
///
/// Quotes without a `StockCode` are skipped. `TotalPages` is optional and
/// ignored when it is not a number.
pub fn parse_listing(xml: &str) -> StockListingPage {
    let stocks = html::find_elements(xml, "QuoteHighLow")
        .into_iter()
        .filter_map(|quote| {
            let code = element_text(quote.inner, "StockCode")?;
            Some(ListedStock {
                code,
                name: element_text(quote.inner, "StockName"),
            })
        })
        .collect();

    let total_pages = element_text(xml, "TotalPages").and_then(|raw| match raw.parse::<u32>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!("Could not parse total pages value: {raw}");
            None
        }
    });

    StockListingPage {
        stocks,
        total_pages,
    }
}

fn element_text(doc: &str, tag: &str) -> Option<String> {
    html::find_first(doc, tag)
        .map(|el| el.text())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<HighLowByAssetsResult xmlns:i="http://www.w3.org/2001/XMLSchema-instance" xmlns="http://schemas.datacontract.org/2004/07/InfoMoney.Framework.WebApi.Services.HighLowByAssets">
  <Quotes>
    <QuoteHighLow>
      <ChangeDay>1.25</ChangeDay>
      <StockCode>PETR4</StockCode>
      <StockName>PETROBRAS PN</StockName>
      <Volume>123456</Volume>
    </QuoteHighLow>
    <QuoteHighLow>
      <StockCode>VALE3</StockCode>
      <StockName i:nil="true"/>
    </QuoteHighLow>
    <QuoteHighLow>
      <StockCode></StockCode>
      <StockName>SEM CODIGO</StockName>
    </QuoteHighLow>
  </Quotes>
  <TotalPages>27</TotalPages>
</HighLowByAssetsResult>"#;

    #[test]
    fn extracts_codes_names_and_page_count() {
        let page = parse_listing(PAGE);

        assert_eq!(
            page.stocks,
            vec![
                ListedStock {
                    code: "PETR4".to_string(),
                    name: Some("PETROBRAS PN".to_string()),
                },
                ListedStock {
                    code: "VALE3".to_string(),
                    name: None,
                },
            ]
        );
        assert_eq!(page.total_pages, Some(27));
    }

    #[test]
    fn tolerates_missing_or_bad_total_pages() {
        let page = parse_listing("<Quotes></Quotes><TotalPages>many</TotalPages>");
        assert!(page.stocks.is_empty());
        assert_eq!(page.total_pages, None);
    }
}
