use std::time::Duration;

use rand::Rng;

use footfall_runner::prelude::{CheckSample, Reporter, RequestRecord};

use crate::client::{JourneyClient, StepRequest, StepResponse};
use crate::fixtures::Fixtures;

/// Statuses the demo storefront returns for a successful add-to-cart: a plain 200 or the
/// post-redirect-get 302.
pub const ADD_TO_CART_ACCEPTED: &[u16] = &[200, 302];

/// The cart API answers 404 for an empty cart; that is an accepted outcome, not a failure.
pub const CART_API_ACCEPTED: &[u16] = &[200, 404];

const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Footfall Load Test"),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
    ),
];

/// Per-iteration choices, made once and reused by the steps that need them: the product viewed
/// in step 3 is the product added to the cart in step 4.
#[derive(Debug, Clone)]
pub struct JourneyPlan {
    pub product_id: String,
    pub quantity: u32,
}

impl JourneyPlan {
    pub fn random(fixtures: &Fixtures, rng: &mut impl Rng) -> Self {
        Self {
            product_id: fixtures.pick_product(rng).to_string(),
            quantity: rng.gen_range(1..=3),
        }
    }
}

/// One pass/fail assertion over a step's response.
pub struct Check {
    pub name: &'static str,
    pub eval: fn(&StepResponse) -> bool,
}

/// A single entry in the journey's step table.
///
/// `stage` groups the steps into the seven journey states; the three read-only API probes
/// share stage 7. `think_multiplier` scales the configured base think time for the pause that
/// follows the step.
pub struct JourneyStep {
    pub endpoint: &'static str,
    pub stage: u8,
    pub think_multiplier: u32,
    pub request: fn(&JourneyPlan) -> StepRequest,
    pub checks: &'static [Check],
}

fn status_is_success(response: &StepResponse) -> bool {
    response.is_success()
}

fn body_mentions_catalogue(response: &StepResponse) -> bool {
    response.body.contains("product") || response.body.contains("shop")
}

fn body_not_empty(response: &StepResponse) -> bool {
    !response.body.is_empty()
}

fn add_to_cart_accepted(response: &StepResponse) -> bool {
    ADD_TO_CART_ACCEPTED.contains(&response.status)
}

fn cart_api_accepted(response: &StepResponse) -> bool {
    CART_API_ACCEPTED.contains(&response.status)
}

fn homepage_request(_plan: &JourneyPlan) -> StepRequest {
    StepRequest::get_with_headers("/", BROWSER_HEADERS)
}

fn products_request(_plan: &JourneyPlan) -> StepRequest {
    StepRequest::get("/products")
}

fn product_detail_request(plan: &JourneyPlan) -> StepRequest {
    StepRequest::get(format!("/product/{}", plan.product_id))
}

fn add_to_cart_request(plan: &JourneyPlan) -> StepRequest {
    StepRequest::post_form(
        "/cart",
        vec![
            ("product_id", plan.product_id.clone()),
            ("quantity", plan.quantity.to_string()),
        ],
    )
}

fn view_cart_request(_plan: &JourneyPlan) -> StepRequest {
    StepRequest::get("/cart")
}

fn checkout_request(_plan: &JourneyPlan) -> StepRequest {
    StepRequest::get("/checkout")
}

fn health_request(_plan: &JourneyPlan) -> StepRequest {
    StepRequest::get("/health")
}

fn products_api_request(_plan: &JourneyPlan) -> StepRequest {
    StepRequest::get("/api/products")
}

fn cart_api_request(_plan: &JourneyPlan) -> StepRequest {
    StepRequest::get("/api/cart")
}

/// The complete user journey, in execution order. Strictly sequential: no branching, no
/// retries, and a failed check never cuts the iteration short.
pub const STEPS: &[JourneyStep] = &[
    JourneyStep {
        endpoint: "homepage",
        stage: 1,
        think_multiplier: 1,
        request: homepage_request,
        checks: &[
            Check {
                name: "Homepage loaded successfully",
                eval: status_is_success,
            },
            Check {
                name: "Homepage contains products",
                eval: body_mentions_catalogue,
            },
        ],
    },
    JourneyStep {
        endpoint: "products",
        stage: 2,
        think_multiplier: 1,
        request: products_request,
        checks: &[
            Check {
                name: "Products page loaded",
                eval: status_is_success,
            },
            Check {
                name: "Products data present",
                eval: body_not_empty,
            },
        ],
    },
    JourneyStep {
        endpoint: "product_detail",
        stage: 3,
        think_multiplier: 2,
        request: product_detail_request,
        checks: &[Check {
            name: "Product detail loaded",
            eval: status_is_success,
        }],
    },
    JourneyStep {
        endpoint: "add_to_cart",
        stage: 4,
        think_multiplier: 1,
        request: add_to_cart_request,
        checks: &[Check {
            name: "Add to cart successful",
            eval: add_to_cart_accepted,
        }],
    },
    JourneyStep {
        endpoint: "view_cart",
        stage: 5,
        think_multiplier: 1,
        request: view_cart_request,
        checks: &[Check {
            name: "Cart page loaded",
            eval: status_is_success,
        }],
    },
    // Checkout is loaded but never submitted, so the run cannot create orders in the target.
    JourneyStep {
        endpoint: "checkout",
        stage: 6,
        think_multiplier: 2,
        request: checkout_request,
        checks: &[Check {
            name: "Checkout page accessible",
            eval: status_is_success,
        }],
    },
    JourneyStep {
        endpoint: "health_api",
        stage: 7,
        think_multiplier: 0,
        request: health_request,
        checks: &[Check {
            name: "Health endpoint responds",
            eval: status_is_success,
        }],
    },
    JourneyStep {
        endpoint: "products_api",
        stage: 7,
        think_multiplier: 0,
        request: products_api_request,
        checks: &[Check {
            name: "Products API responds",
            eval: status_is_success,
        }],
    },
    JourneyStep {
        endpoint: "cart_api",
        stage: 7,
        think_multiplier: 0,
        request: cart_api_request,
        checks: &[Check {
            name: "Cart API responds",
            eval: cart_api_accepted,
        }],
    },
];

/// Run one complete iteration of the journey against `client`.
///
/// Each step is timed and recorded, its checks are evaluated, and one error-rate sample is
/// recorded for the whole check group. A transport failure marks the step's checks failed and
/// the journey moves on to the next step; the step sequence always completes unless the run
/// itself is shutting down.
pub async fn run_journey(
    client: &(impl JourneyClient + ?Sized),
    plan: &JourneyPlan,
    think_time: Duration,
    reporter: &Reporter,
) {
    for step in STEPS {
        let request = (step.request)(plan);
        let record = RequestRecord::start(step.endpoint);

        let mut group_passed = true;
        match client.send(&request).await {
            Ok(response) => {
                reporter.add_request(record.complete(response.status));
                for check in step.checks {
                    let passed = (check.eval)(&response);
                    reporter.add_check(CheckSample::new(step.endpoint, check.name, passed));
                    group_passed &= passed;
                }
            }
            Err(e) => {
                log::debug!("Request to {} failed: {}", step.endpoint, e);
                reporter.add_request(record.fail_transport());
                for check in step.checks {
                    reporter.add_check(CheckSample::new(step.endpoint, check.name, false));
                }
                group_passed = false;
            }
        }
        reporter.add_error_group(step.endpoint, !group_passed);

        think(think_time, step.think_multiplier).await;
    }

    // The iteration-level pause between one simulated user finishing and the next starting.
    think(think_time, 1).await;
}

async fn think(base: Duration, multiplier: u32) {
    let pause = base * multiplier;
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Method, TransportError};
    use async_trait::async_trait;
    use footfall_runner::prelude::ReportConfig;
    use std::collections::{HashMap, HashSet};

    /// Scripted responder keyed by (method, path); unscripted paths get a healthy response.
    struct FakeClient {
        overrides: HashMap<(Method, String), (u16, &'static str)>,
        fail: HashSet<(Method, String)>,
    }

    impl FakeClient {
        fn healthy() -> Self {
            Self {
                overrides: HashMap::new(),
                fail: HashSet::new(),
            }
        }

        fn with_response(mut self, method: Method, path: &str, status: u16, body: &'static str) -> Self {
            self.overrides.insert((method, path.to_string()), (status, body));
            self
        }

        fn with_transport_failure(mut self, method: Method, path: &str) -> Self {
            self.fail.insert((method, path.to_string()));
            self
        }
    }

    #[async_trait]
    impl JourneyClient for FakeClient {
        async fn send(&self, request: &StepRequest) -> Result<StepResponse, TransportError> {
            let key = (request.method, request.path.clone());
            if self.fail.contains(&key) {
                return Err(TransportError::Timeout);
            }

            let (status, body) = self
                .overrides
                .get(&key)
                .copied()
                .unwrap_or((200, "demo shop with product listings"));
            Ok(StepResponse {
                status,
                body: body.to_string(),
            })
        }
    }

    fn plan() -> JourneyPlan {
        JourneyPlan {
            product_id: "OLJCESPC7Z".to_string(),
            quantity: 2,
        }
    }

    fn reporter() -> Reporter {
        ReportConfig::new("test-run", "baseline_load").init()
    }

    #[test]
    fn the_step_table_covers_nine_steps_in_seven_stages() {
        assert_eq!(STEPS.len(), 9);

        let stages: Vec<u8> = STEPS.iter().map(|s| s.stage).collect();
        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted, "steps must run in stage order");

        let distinct: HashSet<u8> = stages.iter().copied().collect();
        assert_eq!(distinct, (1..=7).collect());
        assert_eq!(STEPS.iter().filter(|s| s.stage == 7).count(), 3);

        let endpoints: HashSet<&str> = STEPS.iter().map(|s| s.endpoint).collect();
        assert_eq!(endpoints.len(), STEPS.len(), "endpoint tags must be unique");
    }

    #[test]
    fn steps_reuse_the_planned_product() {
        let plan = plan();

        let detail = (STEPS[2].request)(&plan);
        assert_eq!(detail.path, "/product/OLJCESPC7Z");

        let add = (STEPS[3].request)(&plan);
        let form = add.form.unwrap();
        assert!(form.contains(&("product_id", "OLJCESPC7Z".to_string())));
        assert!(form.contains(&("quantity", "2".to_string())));
    }

    #[tokio::test]
    async fn clean_run_records_no_errors() {
        let reporter = reporter();

        run_journey(&FakeClient::healthy(), &plan(), Duration::ZERO, &reporter).await;

        let snapshot = reporter.snapshot();
        assert_eq!(snapshot.http_reqs.count, 9);
        assert_eq!(snapshot.errors.total(), 9);
        assert_eq!(snapshot.errors.rate, 0.0);
        assert_eq!(snapshot.checks.fails, 0);
        assert_eq!(snapshot.http_req_failed.fails, 0);
    }

    #[tokio::test]
    async fn checkout_failure_does_not_stop_the_journey() {
        let reporter = reporter();
        let client = FakeClient::healthy().with_response(Method::Get, "/checkout", 500, "oops");

        run_journey(&client, &plan(), Duration::ZERO, &reporter).await;

        let snapshot = reporter.snapshot();
        // All nine steps still ran, including the API probes after the failing checkout.
        assert_eq!(snapshot.http_reqs.count, 9);
        assert!(snapshot.endpoints.contains_key("health_api"));
        assert!(snapshot.endpoints.contains_key("cart_api"));
        // Exactly one check group failed.
        assert_eq!(snapshot.errors.fails, 1);
        assert_eq!(snapshot.checks.fails, 1);
        // A 500 is an application failure, not a transport failure.
        assert_eq!(snapshot.http_req_failed.fails, 0);
    }

    #[tokio::test]
    async fn empty_cart_404_is_not_an_error() {
        let reporter = reporter();
        let client = FakeClient::healthy().with_response(Method::Get, "/api/cart", 404, "");

        run_journey(&client, &plan(), Duration::ZERO, &reporter).await;

        assert_eq!(reporter.snapshot().errors.fails, 0);
    }

    #[tokio::test]
    async fn cart_api_5xx_is_an_error() {
        let reporter = reporter();
        let client = FakeClient::healthy().with_response(Method::Get, "/api/cart", 503, "");

        run_journey(&client, &plan(), Duration::ZERO, &reporter).await;

        assert_eq!(reporter.snapshot().errors.fails, 1);
    }

    #[tokio::test]
    async fn add_to_cart_redirect_is_accepted() {
        let reporter = reporter();
        let client = FakeClient::healthy().with_response(Method::Post, "/cart", 302, "");

        run_journey(&client, &plan(), Duration::ZERO, &reporter).await;

        assert_eq!(reporter.snapshot().errors.fails, 0);
    }

    #[tokio::test]
    async fn transport_failure_is_tracked_separately_and_the_journey_continues() {
        let reporter = reporter();
        let client = FakeClient::healthy().with_transport_failure(Method::Get, "/products");

        run_journey(&client, &plan(), Duration::ZERO, &reporter).await;

        let snapshot = reporter.snapshot();
        assert_eq!(snapshot.http_reqs.count, 9);
        assert_eq!(snapshot.http_req_failed.fails, 1);
        assert_eq!(snapshot.errors.fails, 1);
        // Both of the step's checks are failed when no response arrived.
        assert_eq!(snapshot.checks.fails, 2);
        // The failed request contributed no duration sample.
        assert_eq!(snapshot.http_req_duration.as_ref().unwrap().count, 8);
    }
}
