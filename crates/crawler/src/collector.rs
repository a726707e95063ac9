use catalog::{Product, Violation};
use chrono::{Local, NaiveDateTime};

use crate::RawListing;

/// Returns a violation when the listing is priced strictly below the
/// product's MAP. Equal prices are compliant.
pub fn evaluate(product: &Product, listing: &RawListing) -> Option<Violation> {
    evaluate_at(product, listing, Local::now().naive_local())
}

pub fn evaluate_at(
    product: &Product,
    listing: &RawListing,
    detected_at: NaiveDateTime,
) -> Option<Violation> {
    if listing.price >= product.map_price {
        return None;
    }

    Some(Violation::new(
        product,
        listing.seller.clone(),
        listing.price,
        listing.url.clone(),
        detected_at,
    ))
}
