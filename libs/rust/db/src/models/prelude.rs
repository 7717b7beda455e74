pub use super::tour_embedding::Entity as TourEmbedding;
