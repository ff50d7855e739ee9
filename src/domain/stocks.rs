use std::collections::HashSet;

use tracing::{debug, error, info, warn};

use super::JobReport;
use crate::db::{DbResult, StocksRepository};
use crate::models::stock::{NewStock, Stock, StockInput};
use crate::services::{InfomoneySource, ListedStock};

const STOCK_PAGE_BASE: &str = "https://infomoney.com.br";
const DEFAULT_TOTAL_PAGES: u32 = 40;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Inserts the stocks whose code is unknown and fills a missing company on
/// the known ones. Entries without a code are skipped. Returns the inserted rows.
pub async fn save_stocks(
    repo: &dyn StocksRepository,
    inputs: &[StockInput],
) -> DbResult<Vec<Stock>> {
    let mut batch_codes = HashSet::new();
    let mut to_create = Vec::new();

    for input in inputs {
        let Some(code) = non_empty(input.code.as_deref()) else {
            warn!("Skipping stock without code: {input:?}");
            continue;
        };
        if !batch_codes.insert(code.to_string()) {
            continue;
        }
        let company = non_empty(input.company.as_deref());

        if let Some(existing) = repo.find_by_code(code).await? {
            if non_empty(existing.company.as_deref()).is_none() {
                if let Some(company) = company {
                    repo.update_company(existing.id, company).await?;
                    debug!("Filled company of {code} with {company}");
                }
            }
            continue;
        }

        let name = non_empty(input.name.as_deref()).unwrap_or(code);
        to_create.push(NewStock {
            name: name.to_string(),
            code: code.to_string(),
            company: company.or(Some(name)).map(str::to_string),
            url: non_empty(input.url.as_deref())
                .map(str::to_string)
                .or_else(|| Some(stock_page_url(code))),
        });
    }

    if to_create.is_empty() {
        return Ok(Vec::new());
    }
    repo.create_many(&to_create).await
}

pub fn stock_page_url(code: &str) -> String {
    format!("{STOCK_PAGE_BASE}/{code}")
}

fn listed_input(listed: ListedStock) -> StockInput {
    StockInput {
        url: Some(stock_page_url(&listed.code)),
        company: listed.name.clone(),
        name: listed.name,
        code: Some(listed.code),
    }
}

/// Pages through the provider listing and stores the stocks not seen before.
///
/// `processed`/`failed` count listing pages, `saved` counts new stocks. Page
/// failures are logged and skipped.
pub async fn fetch_and_save_stocks(
    repo: &dyn StocksRepository,
    source: &dyn InfomoneySource,
) -> DbResult<JobReport> {
    let mut seen: HashSet<String> = repo
        .find_all()
        .await?
        .into_iter()
        .map(|stock| stock.code)
        .collect();
    info!("Fetching stocks from InfoMoney, {} already known", seen.len());

    let mut report = JobReport::default();
    let mut total_pages = DEFAULT_TOTAL_PAGES;
    let mut listed = Vec::new();
    let mut page = 1;

    while page <= total_pages {
        match source.fetch_stock_page(page).await {
            Ok(listing) => {
                report.processed += 1;
                if page == 1 {
                    if let Some(pages) = listing.total_pages {
                        total_pages = pages;
                        info!("Total pages to fetch: {total_pages}");
                    }
                }
                for stock in listing.stocks {
                    if seen.insert(stock.code.clone()) {
                        listed.push(listed_input(stock));
                    }
                }
                info!(
                    "Processed page {page}/{total_pages}, found {} new stocks so far",
                    listed.len()
                );
            }
            Err(e) => {
                report.failed += 1;
                error!("Failed to fetch stock page {page}: {e}");
            }
        }
        page += 1;
    }

    let created = save_stocks(repo, &listed).await?;
    report.saved = created.len();
    info!("Added {} new stocks from InfoMoney", report.saved);
    Ok(report)
}
