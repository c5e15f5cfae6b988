use rand::seq::SliceRandom;
use rand::Rng;

/// Product ids from the demo storefront catalogue.
const PRODUCTS: &[&str] = &[
    "OLJCESPC7Z",
    "66VCHSJNUP",
    "1YMWWN1N4O",
    "L9ECAV7KIM",
    "2ZYFJ3GM2N",
];

const USERS: &[&str] = &[
    "user1@example.com",
    "user2@example.com",
    "user3@example.com",
    "user4@example.com",
    "user5@example.com",
];

/// Fixed pools of identifiers the journey draws from, known at startup.
///
/// Selection is uniform and has no other side effects; an identifier outside the configured
/// pool can never be returned. An empty pool is a configuration error and is rejected here,
/// before the run starts, rather than on first use.
#[derive(Debug, Clone)]
pub struct Fixtures {
    products: Vec<String>,
    users: Vec<String>,
}

impl Fixtures {
    pub fn new(products: Vec<String>, users: Vec<String>) -> anyhow::Result<Self> {
        anyhow::ensure!(!products.is_empty(), "Product pool must not be empty");
        anyhow::ensure!(!users.is_empty(), "User pool must not be empty");

        Ok(Self { products, users })
    }

    pub fn demo_catalogue() -> Self {
        Self {
            products: PRODUCTS.iter().map(|p| p.to_string()).collect(),
            users: USERS.iter().map(|u| u.to_string()).collect(),
        }
    }

    pub fn pick_product(&self, rng: &mut impl Rng) -> &str {
        self.products
            .choose(rng)
            .expect("product pool is validated non-empty")
    }

    pub fn pick_user(&self, rng: &mut impl Rng) -> &str {
        self.users
            .choose(rng)
            .expect("user pool is validated non-empty")
    }
}
