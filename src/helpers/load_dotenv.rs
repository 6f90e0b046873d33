/// Loads a local `.env` into the environment. Returns whether one was found.
pub fn load_dotenv() -> bool {
    dotenv::dotenv().is_ok()
}
