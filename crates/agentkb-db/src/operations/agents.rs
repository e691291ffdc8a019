//! Agent CRUD operations.

use super::{parse_optional_timestamp, parse_timestamp};
use crate::database::Database;
use crate::error::{DbError, DbResult};
use agentkb_core::{Agent, AgentSummary, AgentUpdate};
use chrono::Utc;
use rusqlite::params;

const AGENT_COLUMNS: &str = "id, name, system_prompt, created_at, updated_at";

impl Database {
    /// Create a new agent.
    pub fn create_agent(&self, agent: &Agent) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO agents (id, name, system_prompt, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                agent.id,
                agent.name,
                agent.system_prompt,
                agent.created_at.to_rfc3339(),
                agent.updated_at.map(|dt| dt.to_rfc3339()),
            ],
        )
        .map_err(|e| DbError::from_insert(e, format!("agent {}", agent.id)))?;
        Ok(())
    }

    /// Get an agent by ID.
    pub fn get_agent(&self, id: &str) -> DbResult<Agent> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLUMNS),
            params![id],
            row_to_agent,
        )
        .map_err(|e| DbError::from_lookup(e, format!("Agent not found: {}", id)))
    }

    /// Check whether an agent exists.
    pub fn agent_exists(&self, id: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM agents WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List all agents with their document counts, oldest first.
    pub fn list_agents(&self) -> DbResult<Vec<AgentSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT a.id, a.name, a.system_prompt, a.created_at, a.updated_at,
                   (SELECT COUNT(*) FROM documents d WHERE d.tenant_id = a.id)
            FROM agents a
            ORDER BY a.created_at ASC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(AgentSummary {
                agent: row_to_agent(row)?,
                document_count: row.get(5)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Apply a partial update and return the updated agent.
    pub fn update_agent(&self, id: &str, update: &AgentUpdate) -> DbResult<Agent> {
        let mut agent = self.get_agent(id)?;
        if update.is_empty() {
            return Ok(agent);
        }

        if let Some(name) = &update.name {
            agent.name = name.clone();
        }
        if let Some(prompt) = &update.system_prompt {
            agent.system_prompt = prompt.clone();
        }
        agent.updated_at = Some(Utc::now());

        let conn = self.conn()?;
        let rows = conn.execute(
            "UPDATE agents SET name = ?2, system_prompt = ?3, updated_at = ?4 WHERE id = ?1",
            params![
                agent.id,
                agent.name,
                agent.system_prompt,
                agent.updated_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Agent not found: {}", id)));
        }

        Ok(agent)
    }

    /// Delete an agent. Its document rows go with it.
    pub fn delete_agent(&self, id: &str) -> DbResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM agents WHERE id = ?1", params![id])?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Agent not found: {}", id)));
        }

        Ok(())
    }
}

fn row_to_agent(row: &rusqlite::Row) -> rusqlite::Result<Agent> {
    let created_at_str: String = row.get(3)?;
    let updated_at_str: Option<String> = row.get(4)?;

    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        system_prompt: row.get(2)?,
        created_at: parse_timestamp(&created_at_str),
        updated_at: parse_optional_timestamp(updated_at_str),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkb_core::Document;

    fn agent(name: &str) -> Agent {
        Agent::new(name, "You answer questions about our products.").unwrap()
    }

    #[test]
    fn test_agent_crud() {
        let db = Database::open_in_memory().unwrap();
        let support = agent("Support");

        db.create_agent(&support).unwrap();
        assert!(db.agent_exists(&support.id).unwrap());

        let fetched = db.get_agent(&support.id).unwrap();
        assert_eq!(fetched.name, "Support");
        assert!(fetched.updated_at.is_none());

        let updated = db
            .update_agent(
                &support.id,
                &AgentUpdate {
                    name: Some("Support Desk".to_string()),
                    system_prompt: None,
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Support Desk");
        assert_eq!(updated.system_prompt, support.system_prompt);
        assert!(updated.updated_at.is_some());

        db.delete_agent(&support.id).unwrap();
        assert!(!db.agent_exists(&support.id).unwrap());
        assert!(matches!(
            db.get_agent(&support.id),
            Err(DbError::NotFound(_))
        ));
        assert!(matches!(
            db.delete_agent(&support.id),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_agents_counts_documents() {
        let db = Database::open_in_memory().unwrap();
        let sales = agent("Sales");
        let legal = agent("Legal");
        db.create_agent(&sales).unwrap();
        db.create_agent(&legal).unwrap();

        for name in ["pricing.pdf", "terms.docx"] {
            let doc = Document::new(&sales.id, name, format!("{}/{}", sales.id, name));
            db.create_document(&doc).unwrap();
        }

        let agents = db.list_agents().unwrap();
        assert_eq!(agents.len(), 2);

        let sales_entry = agents.iter().find(|a| a.agent.id == sales.id).unwrap();
        let legal_entry = agents.iter().find(|a| a.agent.id == legal.id).unwrap();
        assert_eq!(sales_entry.document_count, 2);
        assert_eq!(legal_entry.document_count, 0);
    }

    #[test]
    fn test_update_missing_agent() {
        let db = Database::open_in_memory().unwrap();
        let result = db.update_agent("missing", &AgentUpdate::default());
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }
}
