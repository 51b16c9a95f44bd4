// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page range resolution — turn "1-3,5,7-9" into validated 0-based indices.

use std::collections::BTreeSet;

use pagewerk_core::error::{PagewerkError, Result};
use pagewerk_core::types::PageSelection;
use tracing::debug;

/// Resolve a page expression against a document of `total_pages` pages.
///
/// * empty or `all` (any case) selects every page;
/// * otherwise comma-separated clauses, each `N` or `A-B` (1-based, inclusive);
/// * blank clauses are ignored, overlapping clauses merge silently.
///
/// The result is sorted and de-duplicated.
pub fn resolve_page_range(expr: &str, total_pages: usize) -> Result<PageSelection> {
    let trimmed = expr.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return Ok(PageSelection::all(total_pages));
    }

    let mut pages = BTreeSet::new();
    for clause in trimmed.split(',').map(str::trim) {
        if clause.is_empty() {
            continue;
        }
        match clause.split_once('-') {
            Some((first, last)) => {
                let (first, last) = parse_range(clause, first, last, total_pages)?;
                pages.extend(first - 1..last);
            }
            None => {
                let page = parse_page(clause, total_pages)?;
                pages.insert(page - 1);
            }
        }
    }

    if pages.is_empty() {
        return Err(PagewerkError::NoPagesSpecified);
    }

    debug!(expr, selected = pages.len(), total_pages, "Page range resolved");
    PageSelection::from_indices(pages, total_pages)
}

fn parse_page(clause: &str, total_pages: usize) -> Result<usize> {
    let page: usize = clause
        .parse()
        .map_err(|_| PagewerkError::InvalidPageNumber(clause.to_owned()))?;
    if page < 1 || page > total_pages {
        return Err(PagewerkError::InvalidPageNumber(format!(
            "page {page} out of range (document has {total_pages} pages)"
        )));
    }
    Ok(page)
}

fn parse_range(clause: &str, first: &str, last: &str, total_pages: usize) -> Result<(usize, usize)> {
    let malformed = || PagewerkError::InvalidPageRange(clause.to_owned());
    let first: usize = first.trim().parse().map_err(|_| malformed())?;
    let last: usize = last.trim().parse().map_err(|_| malformed())?;

    if first < 1 || first > last || last > total_pages {
        return Err(PagewerkError::InvalidPageRange(format!(
            "{clause} (document has {total_pages} pages)"
        )));
    }
    Ok((first, last))
}
