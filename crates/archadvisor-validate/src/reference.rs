//! Reference tables the validators check designs against.
//!
//! Numbers are conservative single-node estimates, not vendor maximums.
//! Tables that are scanned for the first match are ordered most specific
//! first.

use archadvisor_types::{FindingCode, Severity};

/// Single-node throughput ceiling for one technology.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Benchmark {
    pub key: &'static str,
    /// Requests (or messages) per second on one node.
    pub rps: u64,
    /// Ceiling once replicated; three times `rps` when absent.
    pub with_replicas: Option<u64>,
}

impl Benchmark {
    const fn new(key: &'static str, rps: u64, with_replicas: Option<u64>) -> Self {
        Self {
            key,
            rps,
            with_replicas,
        }
    }

    pub fn replicated(&self) -> u64 {
        self.with_replicas.unwrap_or(self.rps * 3)
    }
}

/// A capability the requirements may ask for, and how to spot it.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementRule {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub code: FindingCode,
    pub severity: Severity,
}

/// Everything the validators look up. [`ReferenceData::builtin`] is the
/// standard set; tests and embedders may supply their own.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceData {
    pub throughput: &'static [Benchmark],
    /// Estimated availability fraction per technology or service.
    pub availability: &'static [(&'static str, f64)],
    pub eventually_consistent_dbs: &'static [&'static str],
    pub message_brokers: &'static [&'static str],
    pub enterprise_services: &'static [&'static str],
    pub requirement_rules: &'static [RequirementRule],
}

impl ReferenceData {
    pub fn builtin() -> Self {
        BUILTIN
    }

    /// First benchmark whose key appears in `tech`.
    pub fn benchmark_for(&self, tech: &str) -> Option<&Benchmark> {
        self.throughput.iter().find(|b| tech.contains(b.key))
    }

    /// Default availability per component type when no technology matches.
    pub fn type_default_availability(kind: &str) -> f64 {
        match kind {
            "database" | "cache" | "queue" => 0.9990,
            "cdn" | "storage" => 0.9999,
            _ => 0.9995,
        }
    }
}

impl Default for ReferenceData {
    fn default() -> Self {
        BUILTIN
    }
}

const THROUGHPUT: &[Benchmark] = &[
    // databases
    Benchmark::new("postgresql", 10_000, Some(50_000)),
    Benchmark::new("postgres", 10_000, Some(50_000)),
    Benchmark::new("mysql", 10_000, Some(40_000)),
    Benchmark::new("mongodb", 25_000, Some(100_000)),
    Benchmark::new("cassandra", 50_000, Some(200_000)),
    Benchmark::new("dynamodb", 40_000, Some(1_000_000)),
    Benchmark::new("cockroachdb", 8_000, Some(30_000)),
    Benchmark::new("tidb", 15_000, Some(60_000)),
    // caches
    Benchmark::new("redis", 100_000, None),
    Benchmark::new("memcached", 200_000, None),
    Benchmark::new("elasticache", 100_000, None),
    // brokers, messages per second
    Benchmark::new("kafka", 200_000, None),
    Benchmark::new("rabbitmq", 30_000, None),
    Benchmark::new("sqs", 3_000, None),
    Benchmark::new("nats", 500_000, None),
    Benchmark::new("pulsar", 100_000, None),
    // proxies and frameworks
    Benchmark::new("nginx", 50_000, None),
    Benchmark::new("envoy", 40_000, None),
    Benchmark::new("haproxy", 60_000, None),
    Benchmark::new("fastapi", 8_000, None),
    Benchmark::new("express", 5_000, None),
    Benchmark::new("spring_boot", 3_000, None),
    Benchmark::new("spring", 3_000, None),
    Benchmark::new("django", 2_000, None),
    Benchmark::new("flask", 1_500, None),
    Benchmark::new("go_net_http", 30_000, None),
    Benchmark::new("actix", 40_000, None),
    Benchmark::new("fiber", 25_000, None),
];

const AVAILABILITY: &[(&str, f64)] = &[
    // load balancers
    ("alb", 0.9999),
    ("nlb", 0.9999),
    ("elb", 0.9999),
    ("cloud_load_balancer", 0.9999),
    ("load_balancer", 0.9995),
    // databases, managed and multi-az variants first
    ("rds_multi_az", 0.9999),
    ("aurora", 0.9999),
    ("dynamodb", 0.9999),
    ("cosmosdb", 0.9999),
    ("cloud_sql", 0.9995),
    ("rds", 0.9995),
    ("postgresql", 0.9990),
    ("mysql", 0.9990),
    ("mongodb", 0.9990),
    ("cassandra", 0.9995),
    // caches
    ("elasticache", 0.9999),
    ("redis_cluster", 0.9999),
    ("redis", 0.9990),
    ("memcached", 0.9990),
    // brokers
    ("msk", 0.9999),
    ("kafka", 0.9990),
    ("sqs", 0.9999),
    ("sns", 0.9999),
    ("rabbitmq", 0.9990),
    ("eventbridge", 0.9999),
    // storage
    ("s3", 0.99999),
    ("gcs", 0.99999),
    ("ebs", 0.9999),
    // gateways and edge
    ("api_gateway", 0.9999),
    ("apigee", 0.9999),
    ("kong", 0.9995),
    ("cloudfront", 0.9999),
    ("cloudflare", 0.9999),
    // compute
    ("lambda", 0.9999),
    ("fargate", 0.9999),
    ("cloud_run", 0.9999),
    ("cloud_functions", 0.9999),
    ("ecs", 0.9999),
    ("eks", 0.9995),
    ("ec2", 0.9995),
    ("kubernetes", 0.9995),
    ("vm", 0.9990),
];

const EVENTUALLY_CONSISTENT_DBS: &[&str] = &[
    "cassandra",
    "dynamodb",
    "cosmosdb",
    "couchdb",
    "couchbase",
    "riak",
    "voldemort",
    "scylladb",
];

const MESSAGE_BROKERS: &[&str] = &[
    "kafka",
    "rabbitmq",
    "sqs",
    "sns",
    "nats",
    "pulsar",
    "eventbridge",
    "redis_streams",
    "redis streams",
    "kinesis",
    "pubsub",
    "pub/sub",
    "msk",
    "amazon_mq",
    "activemq",
    "zeromq",
];

const ENTERPRISE_SERVICES: &[&str] = &[
    "kafka",
    "msk",
    "kubernetes",
    "eks",
    "gke",
    "aks",
    "aurora",
    "spanner",
    "cosmosdb",
    "redshift",
    "bigquery",
    "databricks",
    "snowflake",
    "elasticsearch",
    "opensearch",
    "istio",
    "consul",
    "vault",
    "terraform",
];

const REQUIREMENT_RULES: &[RequirementRule] = &[
    RequirementRule {
        name: "authentication",
        keywords: &["auth", "authentication", "login", "oauth", "sso", "jwt", "identity"],
        code: FindingCode::MissingAuth,
        severity: Severity::High,
    },
    RequirementRule {
        name: "analytics",
        keywords: &["analytics", "tracking", "metrics", "dashboard", "reporting", "insights"],
        code: FindingCode::MissingAnalytics,
        severity: Severity::Medium,
    },
    RequirementRule {
        name: "disaster recovery",
        keywords: &["disaster recovery", "dr", "rpo", "rto", "backup", "failover"],
        code: FindingCode::MissingDr,
        severity: Severity::High,
    },
    RequirementRule {
        name: "monitoring",
        keywords: &["monitoring", "observability", "alerting", "health check"],
        code: FindingCode::MissingMonitoring,
        severity: Severity::High,
    },
    RequirementRule {
        name: "encryption",
        keywords: &["encryption", "encrypted", "tls", "ssl", "encrypt at rest", "pci"],
        code: FindingCode::MissingEncryption,
        severity: Severity::High,
    },
    RequirementRule {
        name: "rate limiting",
        keywords: &["rate limit", "rate-limit", "throttle", "throttling", "quota"],
        code: FindingCode::MissingRateLimiting,
        severity: Severity::High,
    },
    RequirementRule {
        name: "search",
        keywords: &["search", "full-text search", "elasticsearch", "opensearch"],
        code: FindingCode::MissingSearch,
        severity: Severity::Medium,
    },
    RequirementRule {
        name: "notification",
        keywords: &["notification", "push notification", "alert", "email notification", "sms"],
        code: FindingCode::MissingNotification,
        severity: Severity::Medium,
    },
    RequirementRule {
        name: "caching",
        keywords: &["cache", "caching", "low latency", "sub-100ms", "sub-50ms"],
        code: FindingCode::MissingCaching,
        severity: Severity::Medium,
    },
];

pub static BUILTIN: ReferenceData = ReferenceData {
    throughput: THROUGHPUT,
    availability: AVAILABILITY,
    eventually_consistent_dbs: EVENTUALLY_CONSISTENT_DBS,
    message_brokers: MESSAGE_BROKERS,
    enterprise_services: ENTERPRISE_SERVICES,
    requirement_rules: REQUIREMENT_RULES,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benchmark_prefers_first_match() {
        let data = ReferenceData::builtin();
        assert_eq!(data.benchmark_for("postgresql").unwrap().key, "postgresql");
        assert_eq!(data.benchmark_for("spring_boot").unwrap().key, "spring_boot");
        assert!(data.benchmark_for("go").is_none());
    }

    #[test]
    fn test_replicated_ceiling_defaults_to_triple() {
        let data = ReferenceData::builtin();
        assert_eq!(data.benchmark_for("express").unwrap().replicated(), 15_000);
        assert_eq!(data.benchmark_for("mysql").unwrap().replicated(), 40_000);
    }

    #[test]
    fn test_every_coverage_code_is_a_coverage_finding() {
        for rule in ReferenceData::builtin().requirement_rules {
            assert_eq!(rule.code.category(), archadvisor_types::Category::Coverage);
        }
    }
}
