/// Category tree, subtree listings and the store-native product listings.
mod common;

use aisle::{CatalogError, Gender};
use common::{ids, seeded};

#[tokio::test]
async fn full_tree_keeps_input_order() {
    let f = seeded().await;
    let forest = f.service.category_tree(None).await.unwrap();
    let roots: Vec<&str> = forest.iter().map(|n| n.category.id.as_str()).collect();
    assert_eq!(roots, vec!["men", "women", "accessories"]);

    let men = &forest[0];
    let children: Vec<&str> = men.children.iter().map(|n| n.category.id.as_str()).collect();
    assert_eq!(children, vec!["men-clothing", "men-footwear"]);
    let clothing: Vec<&str> = men.children[0]
        .children
        .iter()
        .map(|n| n.category.id.as_str())
        .collect();
    assert_eq!(clothing, vec!["men-jeans", "men-tshirts"]);
}

#[tokio::test]
async fn gendered_tree_includes_universal_roots() {
    let f = seeded().await;
    let forest = f.service.category_tree(Some(Gender::Women)).await.unwrap();
    let roots: Vec<&str> = forest.iter().map(|n| n.category.id.as_str()).collect();
    assert_eq!(roots, vec!["women", "accessories"]);
    assert_eq!(forest[0].children[0].children[0].category.id, "women-jeans");
}

#[tokio::test]
async fn tree_serializes_children_inline() {
    let f = seeded().await;
    let forest = f.service.category_tree(Some(Gender::Men)).await.unwrap();
    let json = serde_json::to_value(&forest).unwrap();
    assert_eq!(json[0]["id"], "men");
    assert_eq!(json[0]["parentId"], serde_json::Value::Null);
    assert_eq!(json[0]["children"][0]["name"], "Clothing");
}

#[tokio::test]
async fn subtree_lists_products_breadth_first() {
    let f = seeded().await;
    let products = f.service.products_in_category_subtree("men").await.unwrap();
    assert_eq!(
        ids(&products),
        vec!["p-jacket", "p-sneaker", "p-slim", "p-straight", "p-tee", "p-graphic"]
    );
}

#[tokio::test]
async fn subtree_of_leaf_is_its_own_products() {
    let f = seeded().await;
    let products = f
        .service
        .products_in_category_subtree("women-jeans")
        .await
        .unwrap();
    assert_eq!(ids(&products), vec!["p-skinny"]);
}

#[tokio::test]
async fn subtree_of_unknown_category_is_empty() {
    let f = seeded().await;
    let products = f
        .service
        .products_in_category_subtree("does-not-exist")
        .await
        .unwrap();
    assert!(products.is_empty());
}

#[tokio::test]
async fn category_lookups() {
    let f = seeded().await;
    assert_eq!(f.service.category("bags").await.unwrap().name, "Bags");
    assert_eq!(
        f.service.category_by_name("Footwear").await.unwrap().id,
        "men-footwear"
    );
    assert!(matches!(
        f.service.category("nope").await,
        Err(CatalogError::NotFound { kind: "Category", .. })
    ));

    let subs = f.service.subcategories("men-clothing").await.unwrap();
    let sub_ids: Vec<&str> = subs.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(sub_ids, vec!["men-jeans", "men-tshirts"]);

    let women = f.service.categories_by_gender(Gender::Women).await.unwrap();
    assert_eq!(women.len(), 3);
    assert!(women.iter().all(|c| c.gender == Some(Gender::Women)));
}

#[tokio::test]
async fn store_native_listings() {
    let f = seeded().await;
    assert_eq!(
        ids(&f.service.products_by_brand("Levis").await.unwrap()),
        vec!["p-slim", "p-jacket"]
    );
    assert_eq!(
        ids(&f.service.products_by_color("White").await.unwrap()),
        vec!["p-graphic", "p-sneaker"]
    );
    let on_sale = f.service.products_on_sale().await.unwrap();
    assert_eq!(ids(&on_sale), vec!["p-tote"]);
    assert_eq!(on_sale[0].final_price(), 120.0);
    assert_eq!(
        ids(&f.service.products_in_category("men-jeans").await.unwrap()),
        vec!["p-slim", "p-straight"]
    );
}

#[tokio::test]
async fn fallback_search_matches_substrings() {
    let f = seeded().await;
    let found = f.service.fallback_text_search("LEATHER").await.unwrap();
    assert_eq!(ids(&found), vec!["p-tote"]);
}

#[tokio::test]
async fn product_lookup_reports_missing() {
    let f = seeded().await;
    assert_eq!(f.service.product("p-tee").await.unwrap().brand, "Brand X");
    let err = f.service.product("p-missing").await.unwrap_err();
    assert_eq!(err.to_string(), "Product not found: p-missing");
}
