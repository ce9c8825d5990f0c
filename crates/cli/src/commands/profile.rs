use irongpt_core::config::LoadOptions;
use irongpt_core::domain::profile::{ActivityLevel, Gender, Profile};
use irongpt_core::errors::DomainError;
use irongpt_core::store::{JsonFileStateStore, StateStore};

use crate::commands::{current_thread_runtime, load_config, CommandResult};

/// Fields left as `None` keep their stored value.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub activity: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(&self, profile: &Profile) -> Result<Profile, DomainError> {
        let mut updated = profile.clone();
        if let Some(weight_kg) = self.weight_kg {
            updated.weight_kg = weight_kg;
        }
        if let Some(height_cm) = self.height_cm {
            updated.height_cm = height_cm;
        }
        if let Some(age) = self.age {
            updated.age = age;
        }
        if let Some(gender) = &self.gender {
            updated.gender = gender.parse::<Gender>()?;
        }
        if let Some(activity) = &self.activity {
            updated.activity_level = activity.parse::<ActivityLevel>()?;
        }
        updated.validate()?;
        Ok(updated)
    }
}

pub fn show(options: LoadOptions) -> CommandResult {
    let config = match load_config("profile", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime("profile") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let store = JsonFileStateStore::new(config.storage.state_path);
    match runtime.block_on(store.load()) {
        Ok(state) => CommandResult::success("profile", describe(&state.profile)),
        Err(error) => CommandResult::failure("profile", "persistence", error.to_string(), 1),
    }
}

pub fn set(options: LoadOptions, update: ProfileUpdate) -> CommandResult {
    let config = match load_config("profile", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime("profile") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let store = JsonFileStateStore::new(config.storage.state_path);
    runtime.block_on(async {
        let mut state = match store.load().await {
            Ok(state) => state,
            Err(error) => {
                return CommandResult::failure("profile", "persistence", error.to_string(), 1)
            }
        };

        state.profile = match update.apply(&state.profile) {
            Ok(profile) => profile,
            Err(error) => {
                return CommandResult::failure("profile", "invalid_profile", error.to_string(), 2)
            }
        };

        if let Err(error) = store.save(&state).await {
            return CommandResult::failure("profile", "persistence", error.to_string(), 1);
        }
        tracing::info!(
            event_name = "cli.profile.updated",
            correlation_id = "cli",
            tdee_kcal = state.profile.context().tdee_kcal,
            "athlete profile updated"
        );
        CommandResult::success("profile", describe(&state.profile))
    })
}

fn describe(profile: &Profile) -> String {
    format!(
        "weight_kg={} height_cm={} age={} gender={} activity={} bmr_kcal={} tdee_kcal={}",
        profile.weight_kg,
        profile.height_cm,
        profile.age,
        profile.gender,
        profile.activity_level,
        profile.bmr().round(),
        profile.context().tdee_kcal
    )
}
