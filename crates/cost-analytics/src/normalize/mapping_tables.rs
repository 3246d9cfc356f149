//! Built-in provider service name tables.
//!
//! Names follow what each provider's billing export reports. Adding a provider
//! means adding a table here, or importing mappings at runtime.

use crate::models::{CloudProvider, ConfidenceLevel, ServiceCategory, ServiceMapping};
use ServiceCategory::*;

pub(crate) struct BaseMapping {
    pub name: &'static str,
    pub category: ServiceCategory,
    pub aliases: &'static [&'static str],
    pub tags: &'static [&'static str],
}

const fn entry(
    name: &'static str,
    category: ServiceCategory,
    aliases: &'static [&'static str],
    tags: &'static [&'static str],
) -> BaseMapping {
    BaseMapping {
        name,
        category,
        aliases,
        tags,
    }
}

const AWS_SERVICES: &[BaseMapping] = &[
    entry("Amazon Elastic Compute Cloud - Compute", Compute, &["EC2", "Amazon EC2", "AmazonEC2"], &["iaas", "vm"]),
    entry("EC2 - Other", Compute, &["EC2 Other"], &["iaas"]),
    entry("Amazon Simple Storage Service", Storage, &["S3", "Amazon S3", "AmazonS3"], &["object-storage"]),
    entry("Amazon Elastic Block Store", Storage, &["EBS"], &["block-storage"]),
    entry("Amazon Elastic File System", Storage, &["EFS"], &["file-storage"]),
    entry("Amazon Glacier", Storage, &["S3 Glacier", "Glacier"], &["archive"]),
    entry("Amazon Relational Database Service", Database, &["RDS", "Amazon RDS", "AmazonRDS"], &["relational", "managed"]),
    entry("Amazon DynamoDB", Database, &["DynamoDB"], &["nosql", "managed"]),
    entry("Amazon ElastiCache", Database, &["ElastiCache"], &["cache", "managed"]),
    entry("Amazon Redshift", Analytics, &["Redshift"], &["warehouse"]),
    entry("Amazon Athena", Analytics, &["Athena"], &["query"]),
    entry("AWS Glue", Analytics, &["Glue"], &["etl"]),
    entry("Amazon Kinesis", Analytics, &["Kinesis"], &["streaming"]),
    entry("AWS Lambda", Serverless, &["Lambda", "AWSLambda"], &["functions"]),
    entry("Amazon Elastic Container Service", Containers, &["ECS", "Amazon ECS"], &["containers"]),
    entry("Amazon Elastic Kubernetes Service", Containers, &["EKS", "Amazon EKS"], &["kubernetes"]),
    entry("Amazon Virtual Private Cloud", Networking, &["VPC", "Amazon VPC"], &["network"]),
    entry("Amazon CloudFront", Networking, &["CloudFront"], &["cdn"]),
    entry("Amazon Route 53", Networking, &["Route53", "Route 53"], &["dns"]),
    entry("Elastic Load Balancing", Networking, &["ELB", "ALB", "NLB"], &["load-balancer"]),
    entry("AWS Data Transfer", Networking, &["Data Transfer"], &["egress"]),
    entry("Amazon CloudWatch", Monitoring, &["CloudWatch"], &["observability"]),
    entry("AWS CloudTrail", Management, &["CloudTrail"], &["audit"]),
    entry("AWS Config", Management, &["AWS Config Rules"], &["governance"]),
    entry("AWS Key Management Service", Security, &["KMS", "AWS KMS"], &["encryption"]),
    entry("AWS WAF", Security, &["Web Application Firewall"], &["firewall"]),
    entry("Amazon GuardDuty", Security, &["GuardDuty"], &["threat-detection"]),
    entry("Amazon SageMaker", MachineLearning, &["SageMaker"], &["ml"]),
    entry("Amazon Bedrock", MachineLearning, &["Bedrock"], &["ml", "genai"]),
    entry("Amazon Simple Queue Service", Integration, &["SQS", "Amazon SQS"], &["messaging"]),
    entry("Amazon Simple Notification Service", Integration, &["SNS", "Amazon SNS"], &["messaging"]),
    entry("AWS Step Functions", Integration, &["Step Functions"], &["workflow"]),
    entry("AWS CodeBuild", DeveloperTools, &["CodeBuild"], &["ci"]),
    entry("AWS IoT Core", Iot, &["AWS IoT", "IoT Core"], &["iot"]),
    entry("AWS Support (Business)", Support, &["AWS Support", "Support"], &["support"]),
];

const GCP_SERVICES: &[BaseMapping] = &[
    entry("Compute Engine", Compute, &["GCE", "Google Compute Engine"], &["iaas", "vm"]),
    entry("Cloud Storage", Storage, &["GCS", "Google Cloud Storage"], &["object-storage"]),
    entry("Cloud SQL", Database, &["CloudSQL"], &["relational", "managed"]),
    entry("Cloud Spanner", Database, &["Spanner"], &["relational", "managed"]),
    entry("Cloud Firestore", Database, &["Firestore", "Datastore"], &["nosql", "managed"]),
    entry("Cloud Bigtable", Database, &["Bigtable"], &["nosql", "managed"]),
    entry("Cloud Memorystore for Redis", Database, &["Memorystore"], &["cache", "managed"]),
    entry("BigQuery", Analytics, &["BQ", "Google BigQuery"], &["warehouse"]),
    entry("Cloud Dataflow", Analytics, &["Dataflow"], &["streaming"]),
    entry("Cloud Dataproc", Analytics, &["Dataproc"], &["hadoop"]),
    entry("Cloud Pub/Sub", Integration, &["Pub/Sub", "PubSub"], &["messaging"]),
    entry("Cloud Functions", Serverless, &["GCF"], &["functions"]),
    entry("Cloud Run", Serverless, &["Cloud Run Services"], &["containers"]),
    entry("App Engine", Serverless, &["GAE", "Google App Engine"], &["paas"]),
    entry("Kubernetes Engine", Containers, &["GKE", "Google Kubernetes Engine"], &["kubernetes"]),
    entry("Artifact Registry", DeveloperTools, &["Container Registry", "GCR"], &["registry"]),
    entry("Cloud Build", DeveloperTools, &["Google Cloud Build"], &["ci"]),
    entry("Networking", Networking, &["Cloud Networking", "Network Internet Egress"], &["network"]),
    entry("Cloud Load Balancing", Networking, &["Load Balancing"], &["load-balancer"]),
    entry("Cloud CDN", Networking, &["Google Cloud CDN"], &["cdn"]),
    entry("Cloud DNS", Networking, &["Google Cloud DNS"], &["dns"]),
    entry("Cloud Logging", Monitoring, &["Stackdriver Logging"], &["observability"]),
    entry("Cloud Monitoring", Monitoring, &["Stackdriver Monitoring", "Stackdriver"], &["observability"]),
    entry("Vertex AI", MachineLearning, &["AI Platform", "Vertex"], &["ml"]),
    entry("Cloud Key Management Service (KMS)", Security, &["Cloud KMS"], &["encryption"]),
    entry("Security Command Center", Security, &["SCC"], &["threat-detection"]),
    entry("Secret Manager", Security, &["Google Secret Manager"], &["secrets"]),
    entry("Cloud IoT Core", Iot, &["Google IoT Core"], &["iot"]),
    entry("Support", Support, &["Google Cloud Support", "Cloud Support"], &["support"]),
];

const AZURE_SERVICES: &[BaseMapping] = &[
    entry("Virtual Machines", Compute, &["VMs", "Azure Virtual Machines"], &["iaas", "vm"]),
    entry("Virtual Machine Scale Sets", Compute, &["VMSS"], &["iaas", "autoscaling"]),
    entry("Azure App Service", Compute, &["App Service", "Web Apps"], &["paas"]),
    entry("Storage", Storage, &["Azure Storage", "Blob Storage", "Storage Accounts"], &["object-storage"]),
    entry("Managed Disks", Storage, &["Azure Disks"], &["block-storage"]),
    entry("Azure Backup", Storage, &["Backup"], &["archive"]),
    entry("SQL Database", Database, &["Azure SQL", "Azure SQL Database"], &["relational", "managed"]),
    entry("Azure Cosmos DB", Database, &["Cosmos DB", "CosmosDB"], &["nosql", "managed"]),
    entry("Azure Database for PostgreSQL", Database, &["Azure PostgreSQL"], &["relational", "managed"]),
    entry("Azure Cache for Redis", Database, &["Redis Cache"], &["cache", "managed"]),
    entry("Azure Synapse Analytics", Analytics, &["Synapse", "SQL Data Warehouse"], &["warehouse"]),
    entry("Azure Data Factory", Analytics, &["Data Factory", "ADF"], &["etl"]),
    entry("Azure Databricks", Analytics, &["Databricks"], &["spark"]),
    entry("Functions", Serverless, &["Azure Functions"], &["functions"]),
    entry("Azure Kubernetes Service", Containers, &["AKS"], &["kubernetes"]),
    entry("Container Instances", Containers, &["ACI", "Azure Container Instances"], &["containers"]),
    entry("Container Registry", DeveloperTools, &["ACR", "Azure Container Registry"], &["registry"]),
    entry("Azure DevOps", DeveloperTools, &["DevOps", "Visual Studio Team Services"], &["ci"]),
    entry("Virtual Network", Networking, &["VNet", "Azure Virtual Network"], &["network"]),
    entry("Bandwidth", Networking, &["Azure Bandwidth"], &["egress"]),
    entry("Load Balancer", Networking, &["Azure Load Balancer"], &["load-balancer"]),
    entry("Azure DNS", Networking, &["DNS Zones"], &["dns"]),
    entry("Content Delivery Network", Networking, &["Azure CDN"], &["cdn"]),
    entry("Azure Monitor", Monitoring, &["Log Analytics", "Application Insights"], &["observability"]),
    entry("Key Vault", Security, &["Azure Key Vault"], &["secrets"]),
    entry("Microsoft Defender for Cloud", Security, &["Security Center", "Azure Defender"], &["threat-detection"]),
    entry("Azure Machine Learning", MachineLearning, &["Machine Learning", "AML"], &["ml"]),
    entry("Cognitive Services", MachineLearning, &["Azure AI Services", "Azure OpenAI"], &["ml", "genai"]),
    entry("Service Bus", Integration, &["Azure Service Bus"], &["messaging"]),
    entry("Event Grid", Integration, &["Azure Event Grid"], &["messaging"]),
    entry("Logic Apps", Integration, &["Azure Logic Apps"], &["workflow"]),
    entry("IoT Hub", Iot, &["Azure IoT Hub"], &["iot"]),
    entry("Azure Support", Support, &["Support Plans"], &["support"]),
];

pub(crate) fn base_table(provider: CloudProvider) -> &'static [BaseMapping] {
    match provider {
        CloudProvider::Aws => AWS_SERVICES,
        CloudProvider::Gcp => GCP_SERVICES,
        CloudProvider::Azure => AZURE_SERVICES,
    }
}

pub(crate) fn base_mappings(provider: CloudProvider) -> Vec<ServiceMapping> {
    base_table(provider)
        .iter()
        .map(|m| {
            ServiceMapping::new(m.name, m.category, ConfidenceLevel::High)
                .with_aliases(m.aliases.iter().copied())
                .with_tags(m.tags.iter().copied())
        })
        .collect()
}
