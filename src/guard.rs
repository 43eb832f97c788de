//! Route table and the guard that gates protected routes on the auth state.

use tokio::sync::watch;
use tracing::debug;

use crate::auth::AuthState;

pub const LOGIN_PATH: &str = "/login";
pub const LANDING_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Login,
    Register,
    Home,
    MovieDetail(String),
    SeriesList,
    SeriesDetail(String),
    MusicList,
    MusicDetail(String),
    AnimeList,
    AnimeDetail(String),
    Wishlist,
    Profile,
    Unknown(String),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        match segments.as_slice() {
            [] => Route::Landing,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["home"] => Route::Home,
            ["movie", id] => Route::MovieDetail(id.to_string()),
            ["series"] => Route::SeriesList,
            ["series", id] => Route::SeriesDetail(id.to_string()),
            ["music"] => Route::MusicList,
            ["music", id] => Route::MusicDetail(id.to_string()),
            ["anime"] => Route::AnimeList,
            ["anime", id] => Route::AnimeDetail(id.to_string()),
            ["wishlist"] => Route::Wishlist,
            ["profile"] => Route::Profile,
            _ => Route::Unknown(path.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Landing => LANDING_PATH.to_string(),
            Route::Login => LOGIN_PATH.to_string(),
            Route::Register => "/register".to_string(),
            Route::Home => "/home".to_string(),
            Route::MovieDetail(id) => format!("/movie/{id}"),
            Route::SeriesList => "/series".to_string(),
            Route::SeriesDetail(id) => format!("/series/{id}"),
            Route::MusicList => "/music".to_string(),
            Route::MusicDetail(id) => format!("/music/{id}"),
            Route::AnimeList => "/anime".to_string(),
            Route::AnimeDetail(id) => format!("/anime/{id}"),
            Route::Wishlist => "/wishlist".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Unknown(path) => path.clone(),
        }
    }

    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Route::Home
                | Route::MovieDetail(_)
                | Route::SeriesList
                | Route::SeriesDetail(_)
                | Route::MusicList
                | Route::Wishlist
                | Route::Profile
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Authenticated,
    Unauthenticated,
}

impl From<&AuthState> for GuardState {
    fn from(state: &AuthState) -> Self {
        match state {
            AuthState::Loading => GuardState::Loading,
            s if s.is_authenticated() => GuardState::Authenticated,
            _ => GuardState::Unauthenticated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Auth is still hydrating; show a loading indicator.
    Loading,
    Render(Route),
    Redirect(String),
}

pub fn navigate(path: &str, auth: &AuthState) -> Navigation {
    let route = Route::parse(path);
    if let Route::Unknown(_) = route {
        return Navigation::Redirect(LANDING_PATH.to_string());
    }
    if !route.requires_auth() {
        return Navigation::Render(route);
    }
    match GuardState::from(auth) {
        GuardState::Loading => Navigation::Loading,
        GuardState::Authenticated => Navigation::Render(route),
        GuardState::Unauthenticated => Navigation::Redirect(LOGIN_PATH.to_string()),
    }
}

/// One guarded navigation. Starts in `Loading` and settles once auth is known;
/// later auth changes need a new navigation.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    path: String,
    decision: Navigation,
}

impl RouteGuard {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let decision = navigate(&path, &AuthState::Loading);
        Self { path, decision }
    }

    pub fn decision(&self) -> &Navigation {
        &self.decision
    }

    pub fn is_settled(&self) -> bool {
        self.decision != Navigation::Loading
    }

    pub fn update(&mut self, auth: &AuthState) -> &Navigation {
        if !self.is_settled() {
            self.decision = navigate(&self.path, auth);
        }
        &self.decision
    }

    /// Waits for hydration to finish, then decides. A closed channel counts as
    /// logged out.
    pub async fn resolve(auth: &mut watch::Receiver<AuthState>, path: &str) -> Navigation {
        let mut guard = RouteGuard::new(path);
        if guard.is_settled() {
            return guard.decision;
        }
        let state = match auth.wait_for(|s| !s.is_loading()).await {
            Ok(state) => state.clone(),
            Err(_) => AuthState::Ready(None),
        };
        guard.update(&state);
        debug!("Route {} -> {:?}", path, guard.decision);
        guard.decision
    }
}
