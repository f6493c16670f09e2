use crate::endpoints::{activities::ListActivities, athlete::GetAthlete};

#[derive(Default)]
pub struct ActivityRepository {
    per_page: Option<u32>,
}

impl ActivityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Activities of the authenticated athlete, newest first.
    pub fn list(&self) -> ListActivities {
        let request = ListActivities::new();
        match self.per_page {
            Some(per_page) => request.per_page(per_page),
            None => request,
        }
    }
}

pub struct AthleteRepository;

impl AthleteRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn get(&self) -> GetAthlete {
        GetAthlete
    }
}
