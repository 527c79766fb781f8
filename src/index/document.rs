use crate::error::{CatalogError, Result};
use crate::index::schema::ProductSchema;
use crate::types::IndexedProduct;
use tantivy::schema::Value;
use tantivy::TantivyDocument;

/// Fails on an empty id, which could never be replaced or deleted.
pub fn to_tantivy_doc(schema: &ProductSchema, product: &IndexedProduct) -> Result<TantivyDocument> {
    if product.id.is_empty() {
        return Err(CatalogError::InvalidArgument(
            "indexed product has an empty id".to_string(),
        ));
    }
    let mut doc = TantivyDocument::new();
    doc.add_text(schema.id, &product.id);
    doc.add_text(schema.source, serde_json::to_string(product)?);
    doc.add_text(schema.name, &product.name);
    doc.add_text(schema.name_exact, &product.name_exact);
    doc.add_text(schema.description, &product.description);
    doc.add_text(schema.brand, &product.brand);
    doc.add_text(schema.brand_exact, &product.brand_exact);
    doc.add_text(schema.color, &product.color);
    doc.add_text(schema.color_exact, &product.color_exact);
    doc.add_text(schema.category_name, &product.category_name);
    doc.add_text(schema.category_name_exact, &product.category_name_exact);
    if let Some(category_id) = &product.category_id {
        doc.add_text(schema.category_id, category_id);
    }
    doc.add_f64(schema.price, product.price);
    Ok(doc)
}

pub fn doc_id(schema: &ProductSchema, doc: &TantivyDocument) -> Option<String> {
    doc.get_first(schema.id)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

pub fn from_tantivy_doc(schema: &ProductSchema, doc: &TantivyDocument) -> Result<Option<IndexedProduct>> {
    match doc.get_first(schema.source).and_then(|v| v.as_str()) {
        Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
        None => Ok(None),
    }
}
