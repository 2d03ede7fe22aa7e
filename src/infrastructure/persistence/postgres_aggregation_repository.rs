#![cfg(feature = "postgres")]

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::entities::{
    ClusterResource, Domain, DomainResource, Project, ProjectResource, ProjectService,
};
use crate::domain::repositories::AggregationRepository;
use crate::domain::value_objects::ClusterId;
use crate::error::{Error, Result};

/// Postgres-backed aggregation store (§4.D). Table names follow the
/// logical schema in the external interfaces section; migrations
/// themselves are an external collaborator (a separate migration tool).
pub struct PostgresAggregationRepository {
    pool: PgPool,
}

impl PostgresAggregationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_domain(cluster: &ClusterId, row: &sqlx::postgres::PgRow) -> Result<Domain> {
        Ok(Domain {
            cluster: cluster.clone(),
            uuid: row.try_get("uuid").map_err(|e| Error::Database(e.to_string()))?,
            name: row.try_get("name").map_err(|e| Error::Database(e.to_string()))?,
        })
    }

    fn row_to_domain_resource(row: &sqlx::postgres::PgRow) -> Result<DomainResource> {
        Ok(DomainResource {
            service_type: row.try_get("service_type").map_err(|e| Error::Database(e.to_string()))?,
            resource_name: row.try_get("name").map_err(|e| Error::Database(e.to_string()))?,
            quota: row.try_get::<i64, _>("quota").map_err(|e| Error::Database(e.to_string()))? as u64,
        })
    }

    fn row_to_project(cluster: &ClusterId, row: &sqlx::postgres::PgRow) -> Result<Project> {
        Ok(Project {
            cluster: cluster.clone(),
            domain_uuid: row.try_get("domain_uuid").map_err(|e| Error::Database(e.to_string()))?,
            uuid: row.try_get("uuid").map_err(|e| Error::Database(e.to_string()))?,
            name: row.try_get("name").map_err(|e| Error::Database(e.to_string()))?,
            parent_uuid: row.try_get("parent_uuid").map_err(|e| Error::Database(e.to_string()))?,
            has_bursting: row.try_get("has_bursting").map_err(|e| Error::Database(e.to_string()))?,
        })
    }

    fn row_to_project_resource(row: &sqlx::postgres::PgRow) -> Result<ProjectResource> {
        Ok(ProjectResource {
            service_type: row.try_get("service_type").map_err(|e| Error::Database(e.to_string()))?,
            resource_name: row.try_get("name").map_err(|e| Error::Database(e.to_string()))?,
            quota: row.try_get::<i64, _>("quota").map_err(|e| Error::Database(e.to_string()))? as u64,
            backend_quota: row
                .try_get::<i64, _>("backend_quota")
                .map_err(|e| Error::Database(e.to_string()))? as u64,
            usage: row.try_get::<i64, _>("usage").map_err(|e| Error::Database(e.to_string()))? as u64,
            physical_usage: row
                .try_get::<Option<i64>, _>("physical_usage")
                .map_err(|e| Error::Database(e.to_string()))?
                .map(|v| v as u64),
            subresources: row
                .try_get::<Option<Value>, _>("subresources")
                .map_err(|e| Error::Database(e.to_string()))?,
        })
    }
}

#[async_trait]
impl AggregationRepository for PostgresAggregationRepository {
    async fn upsert_domain(&self, domain: &Domain) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO domains (cluster, uuid, name) VALUES ($1, $2, $3)
               ON CONFLICT (cluster, uuid) DO UPDATE SET name = EXCLUDED.name"#,
        )
        .bind(domain.cluster.as_str())
        .bind(domain.uuid)
        .bind(&domain.name)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_domain(&self, cluster: &ClusterId, domain_uuid: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| Error::Database(e.to_string()))?;
        sqlx::query("DELETE FROM domain_resources WHERE service_id IN (SELECT id FROM domain_services WHERE domain_id IN (SELECT id FROM domains WHERE cluster = $1 AND uuid = $2))")
            .bind(cluster.as_str())
            .bind(domain_uuid)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        sqlx::query("DELETE FROM domains WHERE cluster = $1 AND uuid = $2")
            .bind(cluster.as_str())
            .bind(domain_uuid)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        tx.commit().await.map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_domain(&self, cluster: &ClusterId, domain_uuid: Uuid) -> Result<Option<Domain>> {
        let row = sqlx::query("SELECT uuid, name FROM domains WHERE cluster = $1 AND uuid = $2")
            .bind(cluster.as_str())
            .bind(domain_uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        row.map(|r| Self::row_to_domain(cluster, &r)).transpose()
    }

    async fn list_domains(&self, cluster: &ClusterId) -> Result<Vec<Domain>> {
        let rows = sqlx::query("SELECT uuid, name FROM domains WHERE cluster = $1 ORDER BY uuid")
            .bind(cluster.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        rows.iter().map(|r| Self::row_to_domain(cluster, r)).collect()
    }

    async fn upsert_domain_resource(
        &self,
        cluster: &ClusterId,
        domain_uuid: Uuid,
        resource: &DomainResource,
    ) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO domain_resources (service_id, name, quota)
               SELECT ds.id, $4, $5 FROM domain_services ds
               JOIN domains d ON d.id = ds.domain_id
               WHERE d.cluster = $1 AND d.uuid = $2 AND ds.type = $3
               ON CONFLICT (service_id, name) DO UPDATE SET quota = EXCLUDED.quota"#,
        )
        .bind(cluster.as_str())
        .bind(domain_uuid)
        .bind(&resource.service_type)
        .bind(&resource.resource_name)
        .bind(resource.quota as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_domain_resources(
        &self,
        cluster: &ClusterId,
        domain_uuid: Uuid,
    ) -> Result<Vec<DomainResource>> {
        let rows = sqlx::query(
            r#"SELECT ds.type AS service_type, dr.name, dr.quota
               FROM domain_resources dr
               JOIN domain_services ds ON ds.id = dr.service_id
               JOIN domains d ON d.id = ds.domain_id
               WHERE d.cluster = $1 AND d.uuid = $2
               ORDER BY ds.type, dr.name"#,
        )
        .bind(cluster.as_str())
        .bind(domain_uuid)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        rows.iter().map(Self::row_to_domain_resource).collect()
    }

    async fn upsert_project(&self, project: &Project) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO projects (domain_id, uuid, name, parent_uuid, has_bursting)
               SELECT d.id, $3, $4, $5, $6 FROM domains d WHERE d.cluster = $1 AND d.uuid = $2
               ON CONFLICT (uuid) DO UPDATE SET name = EXCLUDED.name, has_bursting = EXCLUDED.has_bursting"#,
        )
        .bind(project.cluster.as_str())
        .bind(project.domain_uuid)
        .bind(project.uuid)
        .bind(&project.name)
        .bind(project.parent_uuid)
        .bind(project.has_bursting)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_project(&self, cluster: &ClusterId, project_uuid: Uuid) -> Result<()> {
        let _ = cluster;
        sqlx::query("DELETE FROM projects WHERE uuid = $1")
            .bind(project_uuid)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_project(&self, cluster: &ClusterId, project_uuid: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query(
            r#"SELECT d.uuid AS domain_uuid, p.uuid, p.name, p.parent_uuid, p.has_bursting
               FROM projects p JOIN domains d ON d.id = p.domain_id
               WHERE d.cluster = $1 AND p.uuid = $2"#,
        )
        .bind(cluster.as_str())
        .bind(project_uuid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        row.map(|r| Self::row_to_project(cluster, &r)).transpose()
    }

    async fn list_projects(&self, cluster: &ClusterId, domain_uuid: Uuid) -> Result<Vec<Project>> {
        let rows = sqlx::query(
            r#"SELECT d.uuid AS domain_uuid, p.uuid, p.name, p.parent_uuid, p.has_bursting
               FROM projects p JOIN domains d ON d.id = p.domain_id
               WHERE d.cluster = $1 AND d.uuid = $2 ORDER BY p.uuid"#,
        )
        .bind(cluster.as_str())
        .bind(domain_uuid)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        rows.iter().map(|r| Self::row_to_project(cluster, r)).collect()
    }

    async fn list_all_projects(&self, cluster: &ClusterId) -> Result<Vec<Project>> {
        let rows = sqlx::query(
            r#"SELECT d.uuid AS domain_uuid, p.uuid, p.name, p.parent_uuid, p.has_bursting
               FROM projects p JOIN domains d ON d.id = p.domain_id
               WHERE d.cluster = $1 ORDER BY p.uuid"#,
        )
        .bind(cluster.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        rows.iter().map(|r| Self::row_to_project(cluster, r)).collect()
    }

    async fn upsert_project_service(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
        service: &ProjectService,
    ) -> Result<()> {
        let _ = cluster;
        sqlx::query(
            r#"INSERT INTO project_services (project_id, type, scraped_at, rates_scraped_at, scrape_error_message)
               SELECT p.id, $2, $3, $4, $5 FROM projects p WHERE p.uuid = $1
               ON CONFLICT (project_id, type) DO UPDATE SET
                 scraped_at = EXCLUDED.scraped_at,
                 rates_scraped_at = EXCLUDED.rates_scraped_at,
                 scrape_error_message = EXCLUDED.scrape_error_message"#,
        )
        .bind(project_uuid)
        .bind(&service.service_type)
        .bind(service.scraped_at)
        .bind(service.rates_scraped_at)
        .bind(&service.scrape_error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_project_services(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
    ) -> Result<Vec<ProjectService>> {
        let _ = cluster;
        let rows = sqlx::query(
            r#"SELECT type AS service_type, scraped_at, rates_scraped_at, scrape_error_message
               FROM project_services ps JOIN projects p ON p.id = ps.project_id
               WHERE p.uuid = $1 ORDER BY type"#,
        )
        .bind(project_uuid)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        rows.into_iter()
            .map(|row| {
                Ok(ProjectService {
                    service_type: row.try_get("service_type").map_err(|e| Error::Database(e.to_string()))?,
                    scraped_at: row.try_get("scraped_at").map_err(|e| Error::Database(e.to_string()))?,
                    rates_scraped_at: row
                        .try_get("rates_scraped_at")
                        .map_err(|e| Error::Database(e.to_string()))?,
                    scrape_error_message: row
                        .try_get("scrape_error_message")
                        .map_err(|e| Error::Database(e.to_string()))?,
                })
            })
            .collect()
    }

    async fn upsert_project_resource(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
        resource: &ProjectResource,
    ) -> Result<()> {
        let _ = cluster;
        sqlx::query(
            r#"INSERT INTO project_resources (service_id, name, quota, backend_quota, usage, physical_usage, subresources)
               SELECT pserv.id, $3, $4, $5, $6, $7, $8
               FROM project_services pserv JOIN projects p ON p.id = pserv.project_id
               WHERE p.uuid = $1 AND pserv.type = $2
               ON CONFLICT (service_id, name) DO UPDATE SET
                 quota = EXCLUDED.quota, backend_quota = EXCLUDED.backend_quota,
                 usage = EXCLUDED.usage, physical_usage = EXCLUDED.physical_usage,
                 subresources = EXCLUDED.subresources"#,
        )
        .bind(project_uuid)
        .bind(&resource.service_type)
        .bind(&resource.resource_name)
        .bind(resource.quota as i64)
        .bind(resource.backend_quota as i64)
        .bind(resource.usage as i64)
        .bind(resource.physical_usage.map(|v| v as i64))
        .bind(&resource.subresources)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_project_resources(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
        service_type: &str,
    ) -> Result<Vec<ProjectResource>> {
        let _ = cluster;
        let rows = sqlx::query(
            r#"SELECT pserv.type AS service_type, pr.name, pr.quota, pr.backend_quota, pr.usage,
                      pr.physical_usage, pr.subresources
               FROM project_resources pr
               JOIN project_services pserv ON pserv.id = pr.service_id
               JOIN projects p ON p.id = pserv.project_id
               WHERE p.uuid = $1 AND pserv.type = $2 ORDER BY pr.name"#,
        )
        .bind(project_uuid)
        .bind(service_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        rows.iter().map(Self::row_to_project_resource).collect()
    }

    async fn list_project_resources_for_domain(
        &self,
        cluster: &ClusterId,
        domain_uuid: Uuid,
        service_type: &str,
        resource_name: &str,
    ) -> Result<Vec<(Uuid, ProjectResource)>> {
        let _ = cluster;
        let rows = sqlx::query(
            r#"SELECT p.uuid AS project_uuid, pserv.type AS service_type, pr.name, pr.quota,
                      pr.backend_quota, pr.usage, pr.physical_usage, pr.subresources
               FROM project_resources pr
               JOIN project_services pserv ON pserv.id = pr.service_id
               JOIN projects p ON p.id = pserv.project_id
               JOIN domains d ON d.id = p.domain_id
               WHERE d.uuid = $1 AND pserv.type = $2 AND pr.name = $3
               ORDER BY p.uuid"#,
        )
        .bind(domain_uuid)
        .bind(service_type)
        .bind(resource_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        rows.iter()
            .map(|r| {
                let uuid: Uuid = r.try_get("project_uuid").map_err(|e| Error::Database(e.to_string()))?;
                Ok((uuid, Self::row_to_project_resource(r)?))
            })
            .collect()
    }

    async fn upsert_cluster_resource(&self, cluster: &ClusterId, resource: &ClusterResource) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO cluster_resources (service_id, name, capacity, capacity_per_az)
               SELECT cs.id, $3, $4, $5 FROM cluster_services cs
               WHERE cs.cluster = $1 AND cs.type = $2
               ON CONFLICT (service_id, name) DO UPDATE SET
                 capacity = EXCLUDED.capacity, capacity_per_az = EXCLUDED.capacity_per_az"#,
        )
        .bind(cluster.as_str())
        .bind(&resource.service_type)
        .bind(&resource.resource_name)
        .bind(resource.capacity as i64)
        .bind(serde_json::to_value(&resource.capacity_per_az).ok())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_cluster_resources(&self, cluster: &ClusterId) -> Result<Vec<ClusterResource>> {
        let rows = sqlx::query(
            r#"SELECT cs.type AS service_type, cr.name, cr.capacity, cr.capacity_per_az
               FROM cluster_resources cr JOIN cluster_services cs ON cs.id = cr.service_id
               WHERE cs.cluster = $1 ORDER BY cs.type, cr.name"#,
        )
        .bind(cluster.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;
        rows.into_iter()
            .map(|row| {
                Ok(ClusterResource {
                    service_type: row.try_get("service_type").map_err(|e| Error::Database(e.to_string()))?,
                    resource_name: row.try_get("name").map_err(|e| Error::Database(e.to_string()))?,
                    capacity: row.try_get::<i64, _>("capacity").map_err(|e| Error::Database(e.to_string()))? as u64,
                    capacity_per_az: row
                        .try_get::<Option<Value>, _>("capacity_per_az")
                        .map_err(|e| Error::Database(e.to_string()))?
                        .and_then(|v| serde_json::from_value(v).ok()),
                    scraped_at: None,
                })
            })
            .collect()
    }

    async fn set_project_resource_quota(
        &self,
        cluster: &ClusterId,
        project_uuid: Uuid,
        service_type: &str,
        resource_name: &str,
        new_quota: u64,
        backend_quota: u64,
    ) -> Result<Option<u64>> {
        let _ = cluster;
        let mut tx = self.pool.begin().await.map_err(|e| Error::Database(e.to_string()))?;
        let previous = sqlx::query(
            r#"SELECT pr.quota FROM project_resources pr
               JOIN project_services pserv ON pserv.id = pr.service_id
               JOIN projects p ON p.id = pserv.project_id
               WHERE p.uuid = $1 AND pserv.type = $2 AND pr.name = $3 FOR UPDATE"#,
        )
        .bind(project_uuid)
        .bind(service_type)
        .bind(resource_name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| Error::Database(e.to_string()))?
        .map(|r| r.try_get::<i64, _>("quota").unwrap_or(0) as u64);

        sqlx::query(
            r#"INSERT INTO project_resources (service_id, name, quota, backend_quota, usage)
               SELECT pserv.id, $3, $4, $5, 0
               FROM project_services pserv JOIN projects p ON p.id = pserv.project_id
               WHERE p.uuid = $1 AND pserv.type = $2
               ON CONFLICT (service_id, name) DO UPDATE SET quota = EXCLUDED.quota, backend_quota = EXCLUDED.backend_quota"#,
        )
        .bind(project_uuid)
        .bind(service_type)
        .bind(resource_name)
        .bind(new_quota as i64)
        .bind(backend_quota as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        tx.commit().await.map_err(|e| Error::Database(e.to_string()))?;
        Ok(previous)
    }

    async fn set_domain_resource_quota(
        &self,
        cluster: &ClusterId,
        domain_uuid: Uuid,
        service_type: &str,
        resource_name: &str,
        new_quota: u64,
    ) -> Result<Option<u64>> {
        let mut tx = self.pool.begin().await.map_err(|e| Error::Database(e.to_string()))?;
        let previous = sqlx::query(
            r#"SELECT dr.quota FROM domain_resources dr
               JOIN domain_services ds ON ds.id = dr.service_id
               JOIN domains d ON d.id = ds.domain_id
               WHERE d.cluster = $1 AND d.uuid = $2 AND ds.type = $3 AND dr.name = $4 FOR UPDATE"#,
        )
        .bind(cluster.as_str())
        .bind(domain_uuid)
        .bind(service_type)
        .bind(resource_name)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| Error::Database(e.to_string()))?
        .map(|r| r.try_get::<i64, _>("quota").unwrap_or(0) as u64);

        sqlx::query(
            r#"INSERT INTO domain_resources (service_id, name, quota)
               SELECT ds.id, $4, $5 FROM domain_services ds
               JOIN domains d ON d.id = ds.domain_id
               WHERE d.cluster = $1 AND d.uuid = $2 AND ds.type = $3
               ON CONFLICT (service_id, name) DO UPDATE SET quota = EXCLUDED.quota"#,
        )
        .bind(cluster.as_str())
        .bind(domain_uuid)
        .bind(service_type)
        .bind(resource_name)
        .bind(new_quota as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        tx.commit().await.map_err(|e| Error::Database(e.to_string()))?;
        Ok(previous)
    }
}
