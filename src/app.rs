//! Workflow logic for COVID-19 Radar
//!
//! This module holds the per-invocation `Context` and the routines the entry
//! point dispatches to: fetching and caching the three time series, listing
//! locations, and showing the stats for one location.

use thiserror::Error;
use tracing::{info, warn};

use crate::cache::{CacheError, CacheManager};
use crate::cli::{CliError, Invocation, UPDATE_QUERY};
use crate::config::{Config, ConfigError};
use crate::data::{ApiError, Category, Covid19ApiClient, TimeSeriesPayload, TimeSeriesSource};
use crate::feedback::{Feedback, FeedbackItem, ICON_BACK, ICON_UPDATE};
use crate::update::{LatestRelease, UpdateChecker, UpdateError};

/// Title of the first row in the stats view
pub const BACK_TITLE: &str = "Back to Locations";
/// Argument of the back row
pub const BACK_ARG: &str = "back";

/// Errors that end an invocation
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Cli(#[from] CliError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error("Row index {index} is out of range ({len} locations)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("{location} has no {category} count for {date}")]
    MissingDate {
        location: String,
        category: Category,
        date: String,
    },
}

/// Everything one invocation works with
pub struct Context<S> {
    pub cache: CacheManager,
    pub source: S,
    pub config: Config,
}

impl Context<Covid19ApiClient> {
    /// Context backed by the live API and the configured cache directory
    pub fn from_config(config: Config) -> Self {
        Self {
            cache: CacheManager::with_dir(config.cache_dir.clone()),
            source: Covid19ApiClient::with_base_url(config.api_base_url.clone()),
            config,
        }
    }
}

impl<S: TimeSeriesSource> Context<S> {
    /// Fetches all three categories in order, caching each as soon as it arrives
    ///
    /// A failure aborts the remaining fetches; categories fetched before the
    /// failure stay cached. Returns the confirmed payload.
    pub async fn refresh_all(&self) -> Result<TimeSeriesPayload, AppError> {
        let confirmed = self.fetch_and_store(Category::Confirmed).await?;
        self.fetch_and_store(Category::Deaths).await?;
        self.fetch_and_store(Category::Recovered).await?;
        Ok(confirmed)
    }

    async fn fetch_and_store(&self, category: Category) -> Result<TimeSeriesPayload, AppError> {
        let payload = self.source.fetch(category).await?;
        self.cache.write(category.key(), &payload)?;
        info!(
            %category,
            locations = payload.locations.len(),
            current_date = %payload.current_date,
            "time series cached"
        );
        Ok(payload)
    }

    /// Payload for `category`, refreshing every category if its entry is stale
    pub async fn payload(&self, category: Category) -> Result<TimeSeriesPayload, AppError> {
        self.cache
            .get_or_refresh(category.key(), self.config.data_max_age, || self.refresh_all())
            .await
    }

    /// Renders the stats of the location at row `index`
    ///
    /// Emits the back row followed by the confirmed, deaths and recovered counts
    /// for the current date of each payload.
    pub async fn show_stats(&self, index: usize) -> Result<Vec<FeedbackItem>, AppError> {
        let mut items = vec![FeedbackItem::new(BACK_TITLE)
            .arg(BACK_ARG)
            .icon(ICON_BACK)
            .valid(true)];

        let mut reference: Option<(String, String)> = None;

        for category in Category::ALL {
            let payload = self.payload(category).await?;
            let row = payload
                .locations
                .get(index)
                .ok_or(AppError::IndexOutOfRange {
                    index,
                    len: payload.locations.len(),
                })?;

            let count = row
                .count_on(&payload.current_date)
                .ok_or_else(|| AppError::MissingDate {
                    location: row.title(),
                    category,
                    date: payload.current_date.clone(),
                })?;

            let (title, date) =
                reference.get_or_insert_with(|| (row.title(), payload.current_date.clone()));
            if *title != row.title() {
                warn!(%category, index, expected = %title, found = %row.title(), "row index maps to a different location");
            }
            if *date != payload.current_date {
                warn!(%category, expected = %date, found = %payload.current_date, "categories report different current dates");
            }

            items.push(FeedbackItem::new(format!("{}: {}", category.label(), count)).valid(true));
        }

        Ok(items)
    }

    /// Runs one invocation and returns the list to show
    ///
    /// The update entry, when there is one, goes first. Actioning it runs the
    /// `Update` invocation, which shows only the release row.
    pub async fn run(&self, invocation: Invocation) -> Result<Feedback, AppError> {
        let items = match invocation {
            Invocation::Update => {
                return Ok([self.release_item().await?].into_iter().collect());
            }
            Invocation::Lookup(index) => self.show_stats(index).await?,
            Invocation::Locations => location_items(&self.payload(Category::Confirmed).await?),
        };

        let mut feedback = Feedback::new();
        if self.config.update_check {
            if let Some(item) = self.check_update().await {
                feedback.push(item);
            }
        }
        feedback.extend(items);

        Ok(feedback)
    }

    /// Update entry if a newer release exists. Failures are logged and ignored.
    async fn check_update(&self) -> Option<FeedbackItem> {
        match self.latest_update().await {
            Ok(Some(release)) => {
                info!(tag = %release.tag_name, "update available");
                Some(update_item())
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "update check failed");
                None
            }
        }
    }

    async fn latest_update(&self) -> Result<Option<LatestRelease>, UpdateError> {
        self.update_checker()?
            .update_available(&self.cache, self.config.update_max_age)
            .await
    }

    /// Row the actioned update entry leads to: the release page, or a notice
    /// that the running version is current
    async fn release_item(&self) -> Result<FeedbackItem, AppError> {
        let checker = self.update_checker()?;
        let item = match checker
            .update_available(&self.cache, self.config.update_max_age)
            .await?
        {
            Some(release) => FeedbackItem::new(format!(
                "Download COVID-19 Radar {}",
                release.tag_name
            ))
            .subtitle("Action this item to open the release page.")
            .arg(checker.release_page(&release))
            .icon(ICON_UPDATE)
            .valid(true),
            None => FeedbackItem::new("COVID-19 Radar is up to date")
                .subtitle(format!("Version {}", self.config.workflow_version)),
        };
        Ok(item)
    }

    fn update_checker(&self) -> Result<UpdateChecker, UpdateError> {
        Ok(UpdateChecker::new(self.config.github_slug.clone())?
            .with_api_url(self.config.github_api_url.clone())
            .with_current_version(self.config.workflow_version.clone()))
    }
}

/// One actionable row per location, in payload order
///
/// The argument is `"<title>;<row index>"`; the launcher hands the index back
/// as `i` when the row is selected.
pub fn location_items(payload: &TimeSeriesPayload) -> Vec<FeedbackItem> {
    payload
        .locations
        .iter()
        .enumerate()
        .map(|(i, location)| {
            let title = location.title();
            let arg = format!("{};{}", title, i);
            FeedbackItem::new(title).arg(arg).valid(true)
        })
        .collect()
}

/// Row announcing a newer release of the workflow
pub fn update_item() -> FeedbackItem {
    FeedbackItem::new("A newer version of COVID-19 Radar is available.")
        .subtitle("Action this item to install the update.")
        .autocomplete(UPDATE_QUERY)
        .icon(ICON_UPDATE)
        .valid(true)
}
