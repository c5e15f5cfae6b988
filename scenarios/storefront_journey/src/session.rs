use std::sync::Arc;

use nanoid::nanoid;
use rand::Rng;
use reqwest::cookie::Jar;
use url::Url;

use crate::fixtures::Fixtures;

/// Per-iteration session state for one simulated user.
///
/// Created at the start of every journey iteration and dropped at its end; never shared
/// between concurrent virtual users. The session token is bound as a `session-id` cookie
/// scoped to the target base URL, so every request the iteration issues carries it.
#[derive(Debug)]
pub struct Session {
    token: String,
    user_id: String,
    jar: Arc<Jar>,
}

impl Session {
    pub fn begin(base_url: &Url, fixtures: &Fixtures, rng: &mut impl Rng) -> Self {
        // Unique enough to never collide within a run; this is a correlation id, not a secret.
        let token = format!("session-{}", nanoid!(9));
        let user_id = fixtures.pick_user(rng).to_string();

        let jar = Jar::default();
        jar.add_cookie_str(&format!("session-id={token}"), base_url);

        Self {
            token,
            user_id,
            jar: Arc::new(jar),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn base_url() -> Url {
        Url::parse("http://localhost:8080").unwrap()
    }

    #[test]
    fn tokens_are_pairwise_distinct_at_run_scale() {
        let fixtures = Fixtures::demo_catalogue();
        let base_url = base_url();
        let mut rng = rand::thread_rng();

        let tokens: HashSet<String> = (0..10_000)
            .map(|_| Session::begin(&base_url, &fixtures, &mut rng).token().to_string())
            .collect();

        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn session_cookie_is_scoped_to_the_base_url() {
        use reqwest::cookie::CookieStore;

        let fixtures = Fixtures::demo_catalogue();
        let base_url = base_url();
        let mut rng = rand::thread_rng();

        let session = Session::begin(&base_url, &fixtures, &mut rng);

        let cookies = session
            .cookie_jar()
            .cookies(&base_url)
            .expect("the session cookie is set for the base URL");
        let header = cookies.to_str().unwrap().to_string();
        assert_eq!(header, format!("session-id={}", session.token()));
    }

    #[test]
    fn user_is_drawn_from_the_pool() {
        let fixtures = Fixtures::demo_catalogue();
        let mut rng = rand::thread_rng();

        let session = Session::begin(&base_url(), &fixtures, &mut rng);

        assert!(session.user_id().ends_with("@example.com"));
    }
}
