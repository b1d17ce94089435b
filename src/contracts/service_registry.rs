use ethers::prelude::*;

// ASAP service registry: the read-side surface the indexer needs.
abigen!(
    ServiceRegistry,
    r#"[
        {
            "inputs": [{ "internalType": "uint256", "name": "_id", "type": "uint256" }],
            "name": "getService",
            "outputs": [
                {
                    "components": [
                        { "internalType": "uint256", "name": "id", "type": "uint256" },
                        { "internalType": "address", "name": "provider", "type": "address" },
                        { "internalType": "uint256", "name": "farcasterId", "type": "uint256" },
                        { "internalType": "string", "name": "endpointUrl", "type": "string" },
                        { "internalType": "string", "name": "metadata", "type": "string" },
                        { "internalType": "uint256", "name": "stakeAmount", "type": "uint256" },
                        { "internalType": "uint256", "name": "reputation", "type": "uint256" },
                        { "internalType": "bool", "name": "isActive", "type": "bool" },
                        { "internalType": "uint256", "name": "createdAt", "type": "uint256" }
                    ],
                    "internalType": "struct ASAPRegistry.Service",
                    "name": "",
                    "type": "tuple"
                }
            ],
            "stateMutability": "view",
            "type": "function"
        },
        {
            "anonymous": false,
            "inputs": [
                { "indexed": true, "internalType": "uint256", "name": "serviceId", "type": "uint256" },
                { "indexed": true, "internalType": "address", "name": "provider", "type": "address" },
                { "indexed": false, "internalType": "uint256", "name": "farcasterId", "type": "uint256" },
                { "indexed": false, "internalType": "string", "name": "endpoint", "type": "string" }
            ],
            "name": "ServiceRegistered",
            "type": "event"
        },
        {
            "anonymous": false,
            "inputs": [
                { "indexed": true, "internalType": "uint256", "name": "serviceId", "type": "uint256" },
                { "indexed": true, "internalType": "address", "name": "attester", "type": "address" },
                { "indexed": false, "internalType": "uint8", "name": "rating", "type": "uint8" },
                { "indexed": false, "internalType": "string", "name": "reviewCid", "type": "string" }
            ],
            "name": "AttestationReceived",
            "type": "event"
        }
    ]"#
);

// Deployed on Ethereum Sepolia
pub const REGISTRY_ADDRESS: &str = "0xdB921Fea9F25e48E2FA3f60a4D33c0Eabb47C246";
