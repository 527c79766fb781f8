use crate::query::model::SearchField;
use crate::tokenizer::{PRODUCT_EXACT, PRODUCT_TEXT};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED,
    STRING,
};

/// Tantivy schema for [`crate::types::IndexedProduct`] with typed field handles.
#[derive(Debug, Clone)]
pub struct ProductSchema {
    schema: Schema,
    pub id: Field,
    pub source: Field,
    pub name: Field,
    pub name_exact: Field,
    pub description: Field,
    pub brand: Field,
    pub brand_exact: Field,
    pub color: Field,
    pub color_exact: Field,
    pub category_name: Field,
    pub category_name_exact: Field,
    pub category_id: Field,
    pub price: Field,
}

impl ProductSchema {
    pub fn build() -> Self {
        let mut builder = Schema::builder();

        let text = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(PRODUCT_TEXT)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );
        let exact = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(PRODUCT_EXACT)
                .set_index_option(IndexRecordOption::WithFreqs),
        );

        let id = builder.add_text_field("id", STRING | STORED);
        let source = builder.add_text_field("_source", STORED);
        let name = builder.add_text_field(SearchField::Name.as_str(), text.clone());
        let name_exact = builder.add_text_field(SearchField::NameExact.as_str(), exact.clone());
        let description = builder.add_text_field(SearchField::Description.as_str(), text.clone());
        let brand = builder.add_text_field(SearchField::Brand.as_str(), text.clone());
        let brand_exact = builder.add_text_field(SearchField::BrandExact.as_str(), exact.clone());
        let color = builder.add_text_field(SearchField::Color.as_str(), text.clone());
        let color_exact = builder.add_text_field(SearchField::ColorExact.as_str(), exact.clone());
        let category_name = builder.add_text_field(SearchField::CategoryName.as_str(), text);
        let category_name_exact =
            builder.add_text_field(SearchField::CategoryNameExact.as_str(), exact);
        let category_id = builder.add_text_field(SearchField::CategoryId.as_str(), STRING);
        let price = builder.add_f64_field(SearchField::Price.as_str(), INDEXED | STORED | FAST);

        ProductSchema {
            schema: builder.build(),
            id,
            source,
            name,
            name_exact,
            description,
            brand,
            brand_exact,
            color,
            color_exact,
            category_name,
            category_name_exact,
            category_id,
            price,
        }
    }

    /// Resolve handles against an existing index's schema, which must have been
    /// created by [`ProductSchema::build`].
    pub fn from_schema(schema: Schema) -> tantivy::Result<Self> {
        let get = |name: &str| schema.get_field(name);
        Ok(ProductSchema {
            id: get("id")?,
            source: get("_source")?,
            name: get(SearchField::Name.as_str())?,
            name_exact: get(SearchField::NameExact.as_str())?,
            description: get(SearchField::Description.as_str())?,
            brand: get(SearchField::Brand.as_str())?,
            brand_exact: get(SearchField::BrandExact.as_str())?,
            color: get(SearchField::Color.as_str())?,
            color_exact: get(SearchField::ColorExact.as_str())?,
            category_name: get(SearchField::CategoryName.as_str())?,
            category_name_exact: get(SearchField::CategoryNameExact.as_str())?,
            category_id: get(SearchField::CategoryId.as_str())?,
            price: get(SearchField::Price.as_str())?,
            schema,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn field(&self, field: SearchField) -> Field {
        match field {
            SearchField::Name => self.name,
            SearchField::NameExact => self.name_exact,
            SearchField::Description => self.description,
            SearchField::Brand => self.brand,
            SearchField::BrandExact => self.brand_exact,
            SearchField::Color => self.color,
            SearchField::ColorExact => self.color_exact,
            SearchField::CategoryName => self.category_name,
            SearchField::CategoryNameExact => self.category_name_exact,
            SearchField::CategoryId => self.category_id,
            SearchField::Price => self.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_search_field_resolves() {
        let s = ProductSchema::build();
        for f in [
            SearchField::Name,
            SearchField::NameExact,
            SearchField::Description,
            SearchField::Brand,
            SearchField::BrandExact,
            SearchField::Color,
            SearchField::ColorExact,
            SearchField::CategoryName,
            SearchField::CategoryNameExact,
            SearchField::CategoryId,
            SearchField::Price,
        ] {
            assert_eq!(s.schema().get_field_name(s.field(f)), f.as_str());
        }
    }

    #[test]
    fn handles_survive_reopen() {
        let built = ProductSchema::build();
        let reopened = ProductSchema::from_schema(built.schema().clone()).unwrap();
        assert_eq!(reopened.price, built.price);
        assert_eq!(reopened.name_exact, built.name_exact);
    }
}
