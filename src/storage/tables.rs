use redb::TableDefinition;

/// User credentials: user -> UserRecord (bincode)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Token records: token_id -> TokenRecord (bincode)
pub const TOKENS: TableDefinition<&str, &[u8]> = TableDefinition::new("tokens");

/// Secondary index: token secret -> token_id (for verification lookups)
pub const TOKEN_IDS: TableDefinition<&str, &str> = TableDefinition::new("token_ids");

/// Secondary index: user -> Vec<token_id> (for listing tokens by owner)
pub const USER_TOKENS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_tokens");

/// Meta: "installation_id" -> String (bincode)
pub const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");
