use crate::aggregate::AggregateState;

/// Renders the final aggregates as the two-section semicolon-delimited
/// report consumers expect:
///
/// ```text
/// By Store
/// Store Name;Total Profit
/// ...
///
/// By Product
/// Product Name;Total Profit;Total Quantity;Total Sold
/// ...
/// ```
///
/// Rows follow the maps' lexicographic key order, so rendering the same
/// state twice gives byte-identical output. The sections are rendered with
/// separate writers and joined with a literal blank line; feeding an empty
/// record through the csv writer would come out quoted instead of blank.
pub fn render(state: &AggregateState) -> Result<Vec<u8>, anyhow::Error> {
    let mut out = store_section(state)?;
    out.push(b'\n');
    out.extend(product_section(state)?);
    Ok(out)
}

fn store_section(state: &AggregateState) -> Result<Vec<u8>, anyhow::Error> {
    let mut wtr = section_writer();
    wtr.write_record(["By Store"])?;
    wtr.write_record(["Store Name", "Total Profit"])?;
    for (store, profit) in &state.profit_by_store {
        let profit = format_amount(*profit);
        wtr.write_record([store.as_str(), profit.as_str()])?;
    }
    finish(wtr)
}

fn product_section(state: &AggregateState) -> Result<Vec<u8>, anyhow::Error> {
    let mut wtr = section_writer();
    wtr.write_record(["By Product"])?;
    wtr.write_record(["Product Name", "Total Profit", "Total Quantity", "Total Sold"])?;
    for (product, profit) in &state.profit_by_product {
        // A product key normally exists in all three maps, but the report
        // must not depend on that.
        let quantity = state
            .quantity_by_product
            .get(product)
            .copied()
            .unwrap_or(0)
            .to_string();
        let revenue = format_amount(
            state
                .revenue_by_product
                .get(product)
                .copied()
                .unwrap_or(0.0),
        );
        let profit = format_amount(*profit);
        wtr.write_record([
            product.as_str(),
            profit.as_str(),
            quantity.as_str(),
            revenue.as_str(),
        ])?;
    }
    finish(wtr)
}

fn section_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_writer(vec![])
}

fn finish(mut wtr: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, anyhow::Error> {
    wtr.flush()?;
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("finishing summary buffer: {e}"))
}

/// Key the finished report is stored under, e.g. `summary-01-01-2024.csv`.
pub fn summary_key(date_tag: &str) -> String {
    format!("summary-{date_tag}.csv")
}

/// Shortest round-trip float formatting, forced to keep one decimal place
/// for whole values so profits read as amounts (`6.0`, not `6`).
fn format_amount(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
