use crate::{
    config::AppConfig,
    db::DbPool,
    error::AppError,
    services::{activities::ActivityService, places::PlacesService, trips::TripService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub trips: TripService,
    pub activities: ActivityService,
    pub places: PlacesService,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Result<Self, AppError> {
        let places = PlacesService::new(&config)?;
        Ok(Self {
            trips: TripService::new(db.clone()),
            activities: ActivityService::new(db),
            places,
            config,
        })
    }
}
