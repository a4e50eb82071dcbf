mod experience;

pub use experience::ExperienceConfig;
