/// Skip a test unless `VAULT_TEST_SYSTEM` opts in to the real system vault.
#[macro_export]
macro_rules! skip_without_system_vault {
    () => {
        if std::env::var("VAULT_TEST_SYSTEM").is_err() {
            eprintln!("SKIPPED: VAULT_TEST_SYSTEM not set");
            return;
        }
    };
}
